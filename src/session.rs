use crate::colors::TagColorAssigner;
use crate::config::{FormConfig, PayloadShape};
use crate::data::Candidate;
use crate::payload::{FormField, Identity, Payload, PayloadBuilder};
use crate::ranking::{candidate_ids, OrderSource, Ranking, RankingError};
use crate::render::{render_rows, RowView};
use crate::storage::{OrderBackend, OrderStore};
use crate::submit::{EmailRule, SubmitError};
use log::{debug, info, warn};
use rand::Rng;
use std::collections::{HashMap, HashSet};

pub struct FormSession<B> {
    config: FormConfig,
    candidates: HashMap<String, Candidate>,
    expected: HashSet<String>,
    ranking: Ranking,
    source: OrderSource,
    colors: TagColorAssigner,
    store: OrderStore<B>,
    builder: PayloadBuilder,
    email_rule: EmailRule,
    rows: Vec<RowView>,
    pending: Vec<FormField>,
}

impl<B: OrderBackend> FormSession<B> {
    /// Restores the saved order when it still matches `candidates`, otherwise
    /// shuffles, then runs the first render, field sync and save.
    pub fn start<R: Rng + ?Sized>(
        config: FormConfig,
        candidates: Vec<Candidate>,
        backend: B,
        rng: &mut R,
    ) -> Result<Self, regex::Error> {
        let email_rule = EmailRule::for_domain(&config.email_domain)?;
        let expected = candidate_ids(&candidates);
        let store = OrderStore::new(backend, config.storage_key.as_str());

        let (ranking, source) = match store.load(&expected) {
            Some(ranking) => (ranking, OrderSource::Restored),
            None => (Ranking::shuffled(&candidates, rng), OrderSource::Shuffled),
        };
        info!(
            "Ranking {} advisors ({:?} order)",
            ranking.len(),
            source
        );

        let builder = PayloadBuilder::new(config.payload_shape.clone(), config.form_name.as_str());
        let candidates = candidates
            .into_iter()
            .map(|candidate| (candidate.id.clone(), candidate))
            .collect();

        let mut session = Self {
            config,
            candidates,
            expected,
            ranking,
            source,
            colors: TagColorAssigner::default(),
            store,
            builder,
            email_rule,
            rows: Vec::new(),
            pending: Vec::new(),
        };
        session.sync();
        session.store.save(&session.ranking);
        Ok(session)
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    pub fn source(&self) -> OrderSource {
        self.source
    }

    pub fn rows(&self) -> &[RowView] {
        &self.rows
    }

    pub fn pending_fields(&self) -> &[FormField] {
        &self.pending
    }

    pub fn store(&self) -> &OrderStore<B> {
        &self.store
    }

    /// Accepts a full new order from the drag widget.
    ///
    /// The proposal must be a permutation of the loaded advisors; anything
    /// else is rejected and the session stays as it was.
    pub fn apply_reorder(&mut self, proposed: Vec<String>) -> Result<(), RankingError> {
        let next = match Ranking::validated(proposed, &self.expected) {
            Ok(next) => next,
            Err(err) => {
                warn!("Rejected reorder: {}", err);
                return Err(err);
            }
        };

        self.ranking = next;
        self.sync();
        self.store.save(&self.ranking);
        Ok(())
    }

    /// Moves the row at `from` to `to`, returning the moved advisor.
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<String, RankingError> {
        let proposed = self.ranking.moved(from, to)?;
        let moved = proposed[to].clone();
        self.apply_reorder(proposed)?;
        debug!("Moved '{}' from {} to {}", moved, from + 1, to + 1);
        Ok(moved)
    }

    pub fn prepare_submission(&self, name: &str, email: &str) -> Result<Payload, SubmitError> {
        let identity = Identity::normalized(name, email);
        if identity.name.is_empty() {
            return Err(SubmitError::MissingName);
        }
        self.email_rule.check(&identity.email)?;

        let payload = self.builder.build(&self.ranking, &identity);
        if payload.overflow > 0 {
            warn!(
                "Only the first {} choices are submitted; {} more are kept in the export only",
                self.ranking.len() - payload.overflow,
                payload.overflow
            );
        }
        Ok(payload)
    }

    pub fn finish_submission(&mut self, succeeded: bool) {
        if succeeded {
            self.sync();
            self.store.save(&self.ranking);
        }
    }

    fn sync(&mut self) {
        self.rows = render_rows(&self.ranking, &self.candidates, &mut self.colors);
        self.pending = self.builder.choice_fields(&self.ranking);

        if let PayloadShape::DiscreteFields { slots } = self.builder.shape() {
            if self.ranking.len() > *slots {
                warn!(
                    "Only the first {} choices can be submitted. Additional choices are saved locally.",
                    slots
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn advisors(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .map(|id| Candidate {
                id: id.to_string(),
                capacity: "2".to_owned(),
                tags: vec!["ML".to_owned()],
            })
            .collect()
    }

    fn backend_with(raw: &str) -> MemoryBackend {
        let mut backend = MemoryBackend::new();
        backend.insert_raw(&FormConfig::default().storage_key, raw);
        backend
    }

    fn start(ids: &[&str], backend: MemoryBackend) -> FormSession<MemoryBackend> {
        let mut rng = StdRng::seed_from_u64(7);
        FormSession::start(FormConfig::default(), advisors(ids), backend, &mut rng).unwrap()
    }

    fn stored(session: &FormSession<MemoryBackend>, ids: &[&str]) -> Option<Vec<String>> {
        let expected = ids.iter().map(|id| id.to_string()).collect();
        session.store().load(&expected).map(|r| r.ids().to_vec())
    }

    #[test]
    fn restores_valid_saved_order() {
        let session = start(&["A", "B", "C"], backend_with(r#"["C","A","B"]"#));
        assert_eq!(session.source(), OrderSource::Restored);
        assert_eq!(session.ranking().ids(), ["C", "A", "B"]);
        assert_eq!(session.rows()[0].name, "C");
    }

    #[test]
    fn stale_saved_order_falls_back_to_shuffle() {
        for raw in [r#"["A","B"]"#, r#"["A","B","D"]"#, "{broken"] {
            let session = start(&["A", "B", "C"], backend_with(raw));
            assert_eq!(session.source(), OrderSource::Shuffled);

            let mut ids = session.ranking().ids().to_vec();
            ids.sort();
            assert_eq!(ids, ["A", "B", "C"]);
        }
    }

    #[test]
    fn initial_order_is_saved() {
        let session = start(&["A", "B", "C", "D"], MemoryBackend::new());
        assert_eq!(
            stored(&session, &["A", "B", "C", "D"]).as_deref(),
            Some(session.ranking().ids())
        );
    }

    #[test]
    fn reorder_updates_rows_fields_and_store() {
        let mut session = start(&["A", "B", "C"], backend_with(r#"["A","B","C"]"#));

        let moved = session.move_row(2, 0).unwrap();

        assert_eq!(moved, "C");
        assert_eq!(session.ranking().ids(), ["C", "A", "B"]);
        assert_eq!(
            session.rows().iter().map(|r| (r.rank, r.name.as_str())).collect::<Vec<_>>(),
            [(1, "C"), (2, "A"), (3, "B")]
        );
        assert_eq!(session.pending_fields()[0].name, "1st Choice");
        assert_eq!(session.pending_fields()[0].value, "C");
        assert_eq!(session.pending_fields()[3].value, "");
        assert_eq!(
            stored(&session, &["A", "B", "C"]),
            Some(vec!["C".to_owned(), "A".to_owned(), "B".to_owned()])
        );
    }

    #[test]
    fn rejected_proposal_changes_nothing() {
        let mut session = start(&["A", "B", "C"], backend_with(r#"["A","B","C"]"#));
        let rows_before = session.rows().to_vec();

        let result = session.apply_reorder(vec!["A".into(), "A".into(), "B".into()]);

        assert_eq!(result, Err(RankingError::Duplicate("A".to_owned())));
        assert_eq!(session.ranking().ids(), ["A", "B", "C"]);
        assert_eq!(session.rows(), rows_before.as_slice());
        assert_eq!(
            stored(&session, &["A", "B", "C"]),
            Some(vec!["A".to_owned(), "B".to_owned(), "C".to_owned()])
        );
        assert!(session.move_row(0, 3).is_err());
    }

    #[test]
    fn failed_save_keeps_new_ranking() {
        let mut backend = backend_with(r#"["A","B"]"#);
        backend.set_fail_writes(true);
        let mut session = start(&["A", "B"], backend);

        session.move_row(0, 1).unwrap();

        assert_eq!(session.ranking().ids(), ["B", "A"]);
        assert_eq!(
            stored(&session, &["A", "B"]),
            Some(vec!["A".to_owned(), "B".to_owned()])
        );
    }

    #[test]
    fn submission_requires_name_and_matching_email() {
        let session = start(&["A", "B"], backend_with(r#"["B","A"]"#));

        assert_eq!(
            session.prepare_submission("  ", "x@columbia.edu"),
            Err(SubmitError::MissingName)
        );
        assert_eq!(
            session.prepare_submission("Grace", "x@gmail.com"),
            Err(SubmitError::InvalidEmail("columbia.edu".to_owned()))
        );

        let payload = session
            .prepare_submission(" Grace ", " X@Columbia.edu")
            .unwrap();
        assert_eq!(
            payload.csv,
            "Name,Email,1st Choice,2nd Choice\nGrace,x@columbia.edu,B,A"
        );
        assert_eq!(payload.file_name, "advisor-choices-x@columbia.edu.csv");
    }

    #[test]
    fn overflow_is_exported_but_not_posted() {
        let config = FormConfig {
            payload_shape: PayloadShape::DiscreteFields { slots: 2 },
            ..FormConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let session = FormSession::start(
            config,
            advisors(&["A", "B", "C"]),
            backend_with(r#"["A","B","C"]"#),
            &mut rng,
        )
        .unwrap();

        let payload = session.prepare_submission("Grace", "g@columbia.edu").unwrap();

        assert_eq!(payload.overflow, 1);
        assert!(payload.fields.iter().all(|field| field.value != "C"));
        assert!(payload.csv.ends_with(",A,B,C"));
    }

    #[derive(Default)]
    struct Recording {
        writes: Vec<Vec<String>>,
    }

    impl OrderBackend for Recording {
        fn read(&self, _key: &str) -> Result<Option<Vec<String>>, crate::storage::StoreError> {
            Ok(self.writes.last().cloned())
        }

        fn write(&mut self, _key: &str, order: &[String]) -> Result<(), crate::storage::StoreError> {
            self.writes.push(order.to_vec());
            Ok(())
        }
    }

    #[test]
    fn successful_submission_saves_order_again() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = FormSession::start(
            FormConfig::default(),
            advisors(&["A", "B"]),
            Recording::default(),
            &mut rng,
        )
        .unwrap();
        session.move_row(1, 0).unwrap();
        assert_eq!(session.store().backend().writes.len(), 2);

        session.finish_submission(false);
        assert_eq!(session.store().backend().writes.len(), 2);

        session.finish_submission(true);
        let writes = &session.store().backend().writes;
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[2].as_slice(), session.ranking().ids());
    }
}
