//! Static disposal advice per waste category
//!
//! Lookups are keyed by display label (the same string the scoring backend
//! stores) and are total: any unrecognised label gets [`DEFAULT_ADVISORY`].

use serde::Serialize;

use crate::ranking::{Category, Prediction};

/// Nearest drop-off point for a category
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Facility {
    pub name: &'static str,
    pub address: &'static str,
    pub distance: &'static str,
}

/// Advice attached to a classification result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Advisory {
    pub recommendation: &'static str,
    pub environmental_impact: &'static str,
    pub sorting_method: &'static str,
    pub facility: Facility,
    pub points: u32,
}

pub static DEFAULT_ADVISORY: Advisory = Advisory {
    recommendation: "Recycle according to the general waste category or dispose of it properly.",
    environmental_impact: "Environmental impact varies. Proper handling is essential to reduce pollution.",
    sorting_method: "Sort according to general guidelines or use the bin for the matching category.",
    facility: Facility {
        name: "TPA Umum Maju Bersama",
        address: "Jl. Lingkungan Hijau No. 10",
        distance: "5.0 km from your location",
    },
    points: 1,
};

static BATTERY: Advisory = Advisory {
    recommendation: "Dispose of at a hazardous waste point or recycle at a dedicated battery facility.",
    environmental_impact: "Batteries contain hazardous chemicals that contaminate soil and water when discarded improperly.",
    sorting_method: "Keep separate from household waste. Collect and drop off at a hazardous waste or battery bin.",
    facility: Facility {
        name: "Pusat Daur Ulang Baterai",
        address: "Jl. Kimia Industri No. 50",
        distance: "7.0 km from your location",
    },
    points: 10,
};

static BIOLOGICAL: Advisory = Advisory {
    recommendation: "Compost at home or use the organic waste bin.",
    environmental_impact: "Organic waste rotting in landfill produces methane, a potent greenhouse gas. Composting reduces these emissions.",
    sorting_method: "Separate food scraps, leaves and twigs. Keep inorganic material out.",
    facility: Facility {
        name: "Pusat Pengomposan Hijau Mandiri",
        address: "Jl. Agrikultura No. 10",
        distance: "4.5 km from your location",
    },
    points: 5,
};

static CARDBOARD: Advisory = Advisory {
    recommendation: "Recycle at a paper and cardboard recycling facility.",
    environmental_impact: "Recycling cardboard saves energy and water and reduces logging.",
    sorting_method: "Make sure the cardboard is clean and dry. Fold or flatten it to save space.",
    facility: Facility {
        name: "Sentra Daur Ulang Kertas & Kardus",
        address: "Jl. Industri Daur Ulang No. 20",
        distance: "3.8 km from your location",
    },
    points: 2,
};

static CLOTHES: Advisory = Advisory {
    recommendation: "Donate to charity, recycle as textile, or reuse as cleaning rags.",
    environmental_impact: "The clothing industry has a large environmental footprint. Donating and recycling reduce textile waste.",
    sorting_method: "Set aside wearable clothes for donation. Damaged clothes can be recycled into other materials.",
    facility: Facility {
        name: "Bank Pakaian Harapan",
        address: "Jl. Donasi Kebaikan No. 30",
        distance: "6.2 km from your location",
    },
    points: 4,
};

static GLASS: Advisory = Advisory {
    recommendation: "Recycle at a glass collection point.",
    environmental_impact: "Glass takes millions of years to break down. Recycling saves energy and raw materials.",
    sorting_method: "Separate bottles and jars by colour (clear, green, brown). Rinse off food residue.",
    facility: Facility {
        name: "Sentra Daur Ulang Kaca Sejahtera",
        address: "Jl. Kaca Bersih No. 78",
        distance: "1.8 km from your location",
    },
    points: 4,
};

static MEDICAL: Advisory = Advisory {
    recommendation: "Dispose of at a dedicated medical waste point. Never mix with household waste.",
    environmental_impact: "Medical waste carries infection risk and hazardous materials. Improper disposal can spread disease.",
    sorting_method: "Use puncture-proof containers for needles and sharps. Ask a local health facility about correct disposal.",
    facility: Facility {
        name: "Fasilitas Pengolahan Limbah Medis",
        address: "Jl. Kesehatan Bersama No. 5",
        distance: "9.5 km from your location",
    },
    points: 15,
};

static METAL: Advisory = Advisory {
    recommendation: "Recycle at a metal recycling facility.",
    environmental_impact: "Recycling metal uses far less energy than producing it from ore and reduces pollution.",
    sorting_method: "Separate drink cans, food tins and other metal items. Make sure they are clean and dry.",
    facility: Facility {
        name: "Gudang Daur Ulang Logam Baja",
        address: "Jl. Logam Jaya No. 15",
        distance: "4.1 km from your location",
    },
    points: 3,
};

static PAPER: Advisory = Advisory {
    recommendation: "Recycle paper at the nearest recycling facility.",
    environmental_impact: "Paper production consumes many trees and much water. Recycling reduces deforestation and water pollution.",
    sorting_method: "Keep paper clean and dry. Avoid greasy or plastic-coated paper.",
    facility: Facility {
        name: "Pusat Daur Ulang Kertas Jaya",
        address: "Jl. Pemilahan No. 45",
        distance: "3.1 km from your location",
    },
    points: 2,
};

static PLASTIC: Advisory = Advisory {
    recommendation: "Recycle at a plastic collection point.",
    environmental_impact: "Plastic can take up to 450 years to break down. Recycling helps reduce soil and water pollution.",
    sorting_method: "Separate plastic from other waste and make sure it is clean and dry before recycling.",
    facility: Facility {
        name: "Bank Sampah Berseri",
        address: "Jl. Raya Pembuangan No. 123",
        distance: "2.5 km from your location",
    },
    points: 3,
};

static SHOES: Advisory = Advisory {
    recommendation: "Donate if still wearable, otherwise recycle at a shoe or rubber facility.",
    environmental_impact: "Shoes are slow to break down and mix several materials. Recycling reduces textile and rubber waste.",
    sorting_method: "Clean the shoes first. Donate wearable pairs and take the rest to a specialised recycler.",
    facility: Facility {
        name: "Pusat Daur Ulang Tekstil & Karet",
        address: "Jl. Solusi Limbah No. 8",
        distance: "5.5 km from your location",
    },
    points: 6,
};

/// Advisory record for a known category
pub fn advisory(category: Category) -> &'static Advisory {
    match category {
        Category::Battery => &BATTERY,
        Category::Biological => &BIOLOGICAL,
        Category::Cardboard => &CARDBOARD,
        Category::Clothes => &CLOTHES,
        Category::Glass => &GLASS,
        Category::Medical => &MEDICAL,
        Category::Metal => &METAL,
        Category::Paper => &PAPER,
        Category::Plastic => &PLASTIC,
        Category::Shoes => &SHOES,
    }
}

/// Advisory record for a display label
///
/// Falls back to [`DEFAULT_ADVISORY`] for anything that is not a known
/// label.
///
/// ```
/// use pilah_scan::advice::{advice_for, DEFAULT_ADVISORY};
///
/// assert_eq!(advice_for("Plastik").points, 3);
/// assert_eq!(advice_for("Styrofoam"), &DEFAULT_ADVISORY);
/// ```
pub fn advice_for(label: &str) -> &'static Advisory {
    Category::from_display_label(label)
        .map(advisory)
        .unwrap_or(&DEFAULT_ADVISORY)
}

/// Points the scan history credits per recorded scan, whatever its category
///
/// The per-category [`Advisory::points`] value is what a fresh result shows
/// as earned; past scans are counted flat.
pub const POINTS_PER_SCAN: u32 = 5;

/// Top prediction with its advisory record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedResult {
    pub category: Category,
    pub label: &'static str,
    pub probability: f32,
    pub advisory: &'static Advisory,
}

pub fn enrich(prediction: &Prediction) -> EnrichedResult {
    let label = prediction.label();
    EnrichedResult {
        category: prediction.category,
        label,
        probability: prediction.probability,
        advisory: advice_for(label),
    }
}
