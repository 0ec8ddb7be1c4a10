//! Charts sheet: data table behind the build-level charts

use super::summary::data_rows;
use crate::config::ModelConfig;
use crate::core::layout::{CellSource, Line, SheetDef};
use crate::types::SheetId;

pub fn definition(cfg: &ModelConfig) -> SheetDef {
    let mut def = SheetDef::new(SheetId::Charts, None);
    def.push(Line::text("KEY CHARTS & VISUALIZATIONS"))
        .push(Line::blank())
        .push(
            Line::text("Year")
                .at(1, CellSource::text("Revenue"))
                .at(2, CellSource::text("EBITDA"))
                .at(3, CellSource::text("Free Cash Flow")),
        )
        .extend(data_rows(cfg));
    def
}
