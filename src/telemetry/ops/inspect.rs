use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Inspect;

#[derive(Copy, Clone, Debug)]
pub enum Phase { FetchPost, Normalize }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::FetchPost => "fetch_post", Phase::Normalize => "normalize" } }
    fn span(&self) -> Span { match self { Phase::FetchPost => info_span!("fetch_post"), Phase::Normalize => info_span!("normalize") } }
}

impl OpMarker for Inspect {
    const NAME: &'static str = "inspect";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("inspect") }
}
