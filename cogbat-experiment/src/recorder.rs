use crate::sequencer::Tabulate;
use cogbat_core::{CompletedTrial, SessionTable, Trial, TrialResult};

/// Append-only log of one task's recorded trials.
#[derive(Debug, Clone)]
pub struct ResultRecorder<S> {
    trials: Vec<CompletedTrial<S>>,
}

impl<S> Default for ResultRecorder<S> {
    fn default() -> Self {
        Self { trials: Vec::new() }
    }
}

impl<S: Clone> ResultRecorder<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trial: Trial<S>, result: TrialResult) {
        self.trials.push(CompletedTrial { trial, result });
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn completed(&self) -> &[CompletedTrial<S>] {
        &self.trials
    }

    /// Numbers rows 1..=n in presentation order.
    pub fn finalize<P>(self, paradigm: &P) -> SessionTable
    where
        P: Tabulate<Spec = S> + ?Sized,
    {
        let mut table = SessionTable::new(paradigm.sheet_name(), paradigm.columns());
        for (i, done) in self.trials.iter().enumerate() {
            table.push_row(paradigm.row(i + 1, done));
        }
        tracing::info!(sheet = %table.sheet, rows = table.len(), "session table finalized");
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogbat_core::{Cell, TrialType};
    use pretty_assertions::assert_eq;

    struct Letters;

    impl Tabulate for Letters {
        type Spec = char;
        fn sheet_name(&self) -> &'static str {
            "letters"
        }
        fn columns(&self) -> &'static [&'static str] {
            &["trial", "block", "letter", "RT"]
        }
        fn row(&self, number: usize, t: &CompletedTrial<char>) -> Vec<Cell> {
            vec![
                number.into(),
                t.trial.block.into(),
                t.trial.spec.to_string().into(),
                t.result.rt_ms.into(),
            ]
        }
    }

    fn trial(block: usize, index: usize, spec: char) -> Trial<char> {
        Trial {
            spec,
            block,
            trial_type: TrialType::Main,
            index,
            block_len: 2,
        }
    }

    fn result(rt: Option<u64>) -> TrialResult {
        TrialResult {
            response: None,
            rt_ms: rt,
            correct: rt.is_some(),
            iti_ms: None,
        }
    }

    #[test]
    fn numbering_spans_blocks_without_gaps() {
        let mut rec = ResultRecorder::new();
        rec.record(trial(1, 0, 'a'), result(Some(400)));
        rec.record(trial(1, 1, 'b'), result(None));
        rec.record(trial(2, 0, 'c'), result(Some(380)));
        let table = rec.finalize(&Letters);
        let numbers: Vec<String> = table
            .column("trial")
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
        assert_eq!(table.rows[1][3], Cell::Na);
        assert_eq!(table.sheet, "letters");
    }

    #[test]
    fn empty_recorder_gives_header_only() {
        let table = ResultRecorder::<char>::new().finalize(&Letters);
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 4);
    }
}
