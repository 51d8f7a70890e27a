/// Tracing targets for this crate. Subscribers can filter on these (e.g. `SLP_STATS=debug`).
#[derive(Debug)]
pub struct Log;

#[allow(non_upper_case_globals)]
impl Log {
    pub const SlpReader: &'static str = "SLP_READER";
    pub const SlpParser: &'static str = "SLP_PARSER";
    pub const SlpStats: &'static str = "SLP_STATS";
}
