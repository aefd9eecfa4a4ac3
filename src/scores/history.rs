use super::{
    models::ScoreModel,
    types::{HistoryResponse, ScoreInfo},
};

/// Computes min, max, mean and the projected score list for one player's records.
///
/// Returns `None` for an empty slice so that "no records" never reaches the
/// aggregation below. Ties on min/max keep the earliest record in slice order.
pub fn aggregate(records: &[ScoreModel]) -> Option<HistoryResponse> {
    let (first, rest) = records.split_first()?;

    let mut top = first;
    let mut low = first;
    let mut sum = first.score as i64;
    for record in rest {
        if record.score > top.score {
            top = record;
        }
        if record.score < low.score {
            low = record;
        }
        sum += record.score as i64;
    }

    Some(HistoryResponse {
        top_score: ScoreInfo::from(top),
        low_score: ScoreInfo::from(low),
        average_score: sum as f64 / records.len() as f64,
        scores: records.iter().map(ScoreInfo::from).collect(),
    })
}
