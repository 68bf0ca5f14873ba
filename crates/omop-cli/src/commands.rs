use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use tracing::{info, info_span};

use omop_cli::cli::{LinkArgs, MapArgs};
use omop_cli::config::{LinkSettings, MapSettings};
use omop_core::LinkPipeline;
use omop_ingest::load_concept_reference;
use omop_map::{MapContext, MapSummary, map_directory, registry};
use omop_model::{RunReport, TableType};

use crate::summary::apply_table_style;

pub struct LinkResult {
    pub settings: LinkSettings,
    pub report: RunReport,
}

pub struct MapResult {
    pub settings: MapSettings,
    pub summaries: Vec<MapSummary>,
}

pub fn run_tables() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Table", "Key column", "Date column"]);
    apply_table_style(&mut table);
    for table_type in TableType::ALL {
        table.add_row(vec![
            table_type.as_str(),
            table_type.id_column(),
            table_type.date_column().unwrap_or("-"),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_link(args: &LinkArgs) -> Result<LinkResult> {
    let settings = LinkSettings::resolve(args).context("resolve link settings")?;
    let start = Instant::now();

    let vocabulary = info_span!("load_vocabulary").in_scope(|| {
        load_concept_reference(&settings.vocabulary).with_context(|| {
            format!(
                "load reference vocabulary {}",
                settings.vocabulary.display()
            )
        })
    })?;
    info!(
        concepts = vocabulary.len(),
        index_date = %settings.options.index_date,
        "reference vocabulary loaded"
    );

    let report = LinkPipeline::new(settings.options.clone(), vocabulary)
        .run(&settings.input_dir, &settings.output_dir)
        .with_context(|| format!("link {}", settings.input_dir.display()))?;
    info!(duration_ms = start.elapsed().as_millis(), "link command finished");

    Ok(LinkResult { settings, report })
}

pub fn run_map(args: &MapArgs) -> Result<MapResult> {
    let settings = MapSettings::resolve(args).context("resolve map settings")?;
    let ctx = MapContext::new(settings.index_date);
    let summaries = map_directory(
        &registry(),
        &settings.source_dir,
        &settings.output_dir,
        &ctx,
    )
    .with_context(|| format!("map {}", settings.source_dir.display()))?;
    Ok(MapResult {
        settings,
        summaries,
    })
}
