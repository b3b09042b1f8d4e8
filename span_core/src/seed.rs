//! # Reference Seed
//!
//! Primary C16 values for the five UK structural elements, as compiled from
//! Approved Document A, TRADA, NHBC and Part K guidance. Every other grade and
//! the extra sections are produced by the derivation engine.
//!
//! The seed ships as `data/uk_seed.json` in the span table document format.
//!
//! | Element          | Seeded sections                        | Derived sections         |
//! |------------------|----------------------------------------|--------------------------|
//! | floor_joists     | 47x100, 47x150, 47x200, 47x225         | 63mm widths (x1.05)      |
//! | ceiling_joists   | 47x100, 63x150                         |                          |
//! | roof_rafters     | 47x150, 47x200                         | 47x225 (x1.15), 47x100 (x0.72) |
//! | stair_stringers  | 47x200 to 50x250, four scenarios       |                          |
//! | stud_walls       | 38x63 to 38x184, three wall types      |                          |

use std::collections::BTreeMap;

use tracing::info;

use crate::config::EngineConfig;
use crate::database::SpanDatabase;
use crate::derivation::{DatabaseDerivation, DerivationEngine, DerivationRequest, SizeExtrapolation};
use crate::elements::names;
use crate::errors::SpanResult;
use crate::file_io;
use crate::ratios::{RAFTER_100_FROM_150, RAFTER_225_FROM_200, WIDTH_63_FROM_47};
use crate::timber::SectionSize;

/// Seed document embedded at compile time
pub const UK_SEED_JSON: &str = include_str!("../data/uk_seed.json");

/// Parse the embedded C16 seed
pub fn reference_seed() -> SpanResult<SpanDatabase> {
    file_io::from_json_str(UK_SEED_JSON)
}

/// Size rules used to complete the reference database
pub fn standard_requests() -> BTreeMap<String, DerivationRequest> {
    let mut floor = DerivationRequest::default();
    for depth in [100, 150, 200, 225] {
        floor = floor.with_size_rule(SizeExtrapolation::new(
            SectionSize::new(63, depth),
            SectionSize::new(47, depth),
            WIDTH_63_FROM_47,
            "63mm width, approx. 5% over 47mm",
        ));
    }

    let rafters = DerivationRequest::default()
        .with_size_rule(SizeExtrapolation::new(
            SectionSize::new(47, 225),
            SectionSize::new(47, 200),
            RAFTER_225_FROM_200,
            "deeper section",
        ))
        .with_size_rule(SizeExtrapolation::new(
            SectionSize::new(47, 100),
            SectionSize::new(47, 150),
            RAFTER_100_FROM_150,
            "small rafter for low-pitch and lean-to roofs",
        ));

    BTreeMap::from([
        (names::FLOOR_JOISTS.to_string(), floor),
        (names::ROOF_RAFTERS.to_string(), rafters),
    ])
}

/// Seed, then derive every grade and the standard extra sections.
pub fn build_reference_database() -> SpanResult<(SpanDatabase, DatabaseDerivation)> {
    build_reference_database_with(&EngineConfig::default())
}

/// Build with a custom configuration. The database's grade and spacing
/// registry is replaced by the configuration's.
pub fn build_reference_database_with(config: &EngineConfig) -> SpanResult<(SpanDatabase, DatabaseDerivation)> {
    config.validate()?;
    let mut database = reference_seed()?;
    config.apply_to(&mut database.timber_specifications);
    let seeded = database.entry_count();

    let engine = DerivationEngine::new(config);
    let outcome = engine.derive_database(&mut database, &standard_requests());

    info!(
        seeded,
        derived = outcome.derived_count(),
        total = database.entry_count(),
        "reference database built"
    );
    Ok((database, outcome))
}
