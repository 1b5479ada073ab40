use crate::models::{AvailabilityRule, CertaintyLevel};

/// All rules applying to one date, summarised by the strongest certainty.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDay<'a> {
    pub headline: CertaintyLevel,
    pub rules: Vec<&'a AvailabilityRule>,
}

/// Returns `None` when nothing applies. The headline only picks the calendar
/// colour; every input rule is kept.
pub fn merge_day<'a>(applicable: &[&'a AvailabilityRule]) -> Option<MergedDay<'a>> {
    let headline = applicable.iter().map(|r| r.certainty).max()?;
    Some(MergedDay {
        headline,
        rules: applicable.to_vec(),
    })
}
