use crate::config::{FormConfig, CONFIG_SOURCE};
use gloo_net::http::Request;
use log::warn;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub capacity: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("network error: {0}")]
    Network(String),
    #[error("could not parse advisor list: {0}")]
    Parse(String),
    #[error("advisor list does not contain any advisors")]
    Empty,
}

impl DataError {
    fn network<E: std::fmt::Display>(err: E) -> Self {
        Self::Network(err.to_string())
    }

    fn parse<E: std::fmt::Display>(err: E) -> Self {
        Self::Parse(err.to_string())
    }
}

/// The served config document, or defaults if there is none.
pub async fn fetch_config() -> FormConfig {
    let text = match Request::get(CONFIG_SOURCE).send().await {
        Ok(response) if response.ok() => match response.text().await {
            Ok(text) => Some(text),
            Err(err) => {
                warn!("Could not read {}: {}", CONFIG_SOURCE, err);
                None
            }
        },
        Ok(response) => {
            warn!(
                "No {} (HTTP {}), using defaults",
                CONFIG_SOURCE,
                response.status()
            );
            None
        }
        Err(err) => {
            warn!("Could not fetch {}: {}", CONFIG_SOURCE, err);
            None
        }
    };
    FormConfig::from_json_or_default(text.as_deref())
}

pub async fn fetch_advisors(config: &FormConfig) -> Result<Vec<Candidate>, DataError> {
    let response = Request::get(&config.data_source)
        .send()
        .await
        .map_err(DataError::network)?;

    if !response.ok() {
        return Err(DataError::Network(format!(
            "HTTP {} while fetching {}",
            response.status(),
            config.data_source
        )));
    }

    let text = response.text().await.map_err(DataError::network)?;
    parse_advisors(&text, config)
}

pub fn parse_advisors(text: &str, config: &FormConfig) -> Result<Vec<Candidate>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(DataError::parse)?
        .iter()
        .map(|field| field.trim_start_matches('\u{feff}').to_owned())
        .collect();

    let name_index = headers
        .iter()
        .position(|field| *field == config.name_column)
        .ok_or_else(|| DataError::Parse(format!("missing '{}' column", config.name_column)))?;
    let capacity_index = headers
        .iter()
        .position(|field| *field == config.capacity_column);
    let tag_field = find_tag_field(&headers, config);
    let tag_index = headers.iter().position(|field| *field == tag_field);

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for record in reader.records() {
        let record = record.map_err(DataError::parse)?;
        let id = record.get(name_index).unwrap_or("").trim().to_owned();
        if id.is_empty() {
            continue;
        }
        if !seen.insert(id.clone()) {
            warn!("Skipping duplicate advisor '{}'", id);
            continue;
        }

        let capacity = capacity_index
            .and_then(|index| record.get(index))
            .unwrap_or("")
            .trim()
            .to_owned();
        let tags = tag_index
            .and_then(|index| record.get(index))
            .map(parse_tags)
            .unwrap_or_default();

        candidates.push(Candidate { id, capacity, tags });
    }

    if candidates.is_empty() {
        return Err(DataError::Empty);
    }

    Ok(candidates)
}

pub fn find_tag_field(headers: &[String], config: &FormConfig) -> String {
    let hint = config.tag_column_hint.to_lowercase();
    headers
        .iter()
        .find(|field| field.to_lowercase().contains(&hint))
        .or_else(|| {
            headers
                .get(config.tag_column_index)
                .filter(|field| !field.is_empty())
        })
        .cloned()
        .unwrap_or_else(|| config.tag_column_default.clone())
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|field| field.to_string()).collect()
    }

    #[test]
    fn tag_field_prefers_hint_match() {
        let config = FormConfig::default();
        let fields = headers(&["Name", "Capacity", "Dept", "Research Methods"]);
        assert_eq!(find_tag_field(&fields, &config), "Research Methods");
    }

    #[test]
    fn tag_field_falls_back_to_position_then_default() {
        let config = FormConfig::default();
        assert_eq!(
            find_tag_field(&headers(&["Name", "Capacity", "Focus"]), &config),
            "Focus"
        );
        assert_eq!(
            find_tag_field(&headers(&["Name", "Capacity"]), &config),
            "Tags"
        );
    }

    #[test]
    fn parse_tags_trims_and_drops_empties() {
        assert_eq!(parse_tags(" ML,  , Causal Inference ,"), vec!["ML", "Causal Inference"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn parses_rows_and_skips_unnamed() {
        let text = "Name,Capacity,Methods\n\
                    \"  Ada Lovelace \",3,\"ML, Stats\"\n\
                    ,2,Surveys\n\
                    \n\
                    Alan Turing, 1 ,\n";
        let candidates = parse_advisors(text, &FormConfig::default()).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "Ada Lovelace");
        assert_eq!(candidates[0].capacity, "3");
        assert_eq!(candidates[0].tags, vec!["ML", "Stats"]);
        assert_eq!(candidates[1].id, "Alan Turing");
        assert_eq!(candidates[1].capacity, "1");
        assert!(candidates[1].tags.is_empty());
    }

    #[test]
    fn duplicate_names_keep_first_row() {
        let text = "Name,Capacity,Methods\nAda,3,ML\nAda,1,Stats\n";
        let candidates = parse_advisors(text, &FormConfig::default()).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].tags, vec!["ML"]);
    }

    #[test]
    fn byte_order_mark_on_header_is_ignored() {
        let text = "\u{feff}Name,Capacity\nAda,2\n";
        let candidates = parse_advisors(text, &FormConfig::default()).unwrap();
        assert_eq!(candidates[0].id, "Ada");
    }

    #[test]
    fn missing_name_column_is_parse_error() {
        let result = parse_advisors("Advisor,Capacity\nAda,2\n", &FormConfig::default());
        assert!(matches!(result, Err(DataError::Parse(_))));
    }

    #[test]
    fn empty_list_is_rejected() {
        let result = parse_advisors("Name,Capacity\n,2\n", &FormConfig::default());
        assert!(matches!(result, Err(DataError::Empty)));
    }
}
