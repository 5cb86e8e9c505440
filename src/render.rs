use crate::colors::TagColorAssigner;
use crate::data::Candidate;
use crate::ranking::Ranking;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPill {
    pub label: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub rank: usize,
    pub name: String,
    pub capacity: String,
    pub tags: Vec<TagPill>,
}

impl RowView {
    pub fn capacity_label(&self) -> &str {
        if self.capacity.is_empty() {
            "0"
        } else {
            &self.capacity
        }
    }
}

/// Rows in ranking order, ranks starting at 1.
pub fn render_rows(
    ranking: &Ranking,
    candidates: &HashMap<String, Candidate>,
    colors: &mut TagColorAssigner,
) -> Vec<RowView> {
    ranking
        .ids()
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let (capacity, tags) = match candidates.get(id) {
                Some(candidate) => (
                    candidate.capacity.clone(),
                    candidate
                        .tags
                        .iter()
                        .map(|tag| TagPill {
                            label: tag.clone(),
                            color: colors.color_for(tag),
                        })
                        .collect(),
                ),
                None => (String::new(), Vec::new()),
            };

            RowView {
                rank: index + 1,
                name: id.clone(),
                capacity,
                tags,
            }
        })
        .collect()
}
