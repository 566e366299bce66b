use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Migrate;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Plan, FetchTaxonomy, FetchPosts, LoadTables, Post, Normalize, Convert, Enrich, WriteDoc }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Plan => "plan",
        Phase::FetchTaxonomy => "fetch_taxonomy",
        Phase::FetchPosts => "fetch_posts",
        Phase::LoadTables => "load_tables",
        Phase::Post => "post",
        Phase::Normalize => "normalize",
        Phase::Convert => "convert",
        Phase::Enrich => "enrich",
        Phase::WriteDoc => "write_doc",
    }}
    fn span(&self) -> Span { match self {
        Phase::Plan => info_span!("plan"),
        Phase::FetchTaxonomy => info_span!("fetch_taxonomy"),
        Phase::FetchPosts => info_span!("fetch_posts"),
        Phase::LoadTables => info_span!("load_tables"),
        Phase::Post => info_span!("post"),
        Phase::Normalize => info_span!("normalize"),
        Phase::Convert => info_span!("convert"),
        Phase::Enrich => info_span!("enrich"),
        Phase::WriteDoc => info_span!("write_doc"),
    }}
}

impl OpMarker for Migrate {
    const NAME: &'static str = "migrate";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("migrate") }
}
