//! The evolving transcript of a session.
//!
//! Slots split into a settled prefix of final results followed by interim
//! guesses. An update names the lowest slot it rewrites (`result_index`);
//! every slot from there on is replaced by the update's results. Settled
//! slots are never rewritten.

use speechflow_core::{RecognitionResult, SessionError};

/// An update as it was applied to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdate {
    /// Index as it goes on the wire.
    pub result_index: i32,
    pub results: Vec<RecognitionResult>,
}

impl LedgerUpdate {
    pub fn has_final(&self) -> bool {
        self.results.first().is_some_and(|r| r.is_final)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultLedger {
    slots: Vec<RecognitionResult>,
    settled: usize,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[RecognitionResult] {
        &self.slots
    }

    /// Number of leading final slots.
    pub fn settled_len(&self) -> usize {
        self.settled
    }

    pub fn settled(&self) -> &[RecognitionResult] {
        &self.slots[..self.settled]
    }

    pub fn interim(&self) -> &[RecognitionResult] {
        &self.slots[self.settled..]
    }

    pub fn apply_update(
        &mut self,
        result_index: usize,
        mut results: Vec<RecognitionResult>,
    ) -> Result<LedgerUpdate, SessionError> {
        let wire_index = i32::try_from(result_index).map_err(|_| {
            rejected(format!("result index {result_index} exceeds the wire range"))
        })?;
        if result_index > self.slots.len() {
            return Err(rejected(format!(
                "result index {result_index} leaves a gap after {} slots",
                self.slots.len()
            )));
        }
        if result_index < self.settled {
            return Err(rejected(format!(
                "result index {result_index} would overwrite settled slot (settled up to {})",
                self.settled
            )));
        }

        let finals = results.iter().filter(|r| r.is_final).count();
        if finals > 1 {
            return Err(rejected(format!("{finals} final results in one update")));
        }
        let has_final = finals == 1;
        if has_final && !results[0].is_final {
            return Err(rejected("final result must come first"));
        }
        if has_final && result_index != self.settled {
            return Err(rejected(format!(
                "final result at index {result_index} does not follow settled slot {}",
                self.settled
            )));
        }

        for result in &mut results {
            check_unit_range(result)?;
            if result.is_final {
                result.stability = None;
            }
        }

        self.slots.truncate(result_index);
        self.slots.extend(results.iter().cloned());
        if has_final {
            self.settled += 1;
        }

        tracing::trace!(
            result_index,
            slots = self.slots.len(),
            settled = self.settled,
            "ledger updated"
        );
        Ok(LedgerUpdate {
            result_index: wire_index,
            results,
        })
    }

    pub fn into_results(self) -> Vec<RecognitionResult> {
        self.slots
    }
}

fn check_unit_range(result: &RecognitionResult) -> Result<(), SessionError> {
    let in_range = |v: Option<f32>| v.map_or(true, |v| (0.0..=1.0).contains(&v));
    if !in_range(result.stability) {
        return Err(rejected("stability outside [0, 1]"));
    }
    if result.alternatives.iter().any(|a| !in_range(a.confidence)) {
        return Err(rejected("confidence outside [0, 1]"));
    }
    Ok(())
}

fn rejected(reason: impl Into<String>) -> SessionError {
    SessionError::InvalidLedgerUpdate(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use speechflow_core::RecognitionAlternative;

    fn interim(text: &str) -> RecognitionResult {
        RecognitionResult::interim(vec![RecognitionAlternative::new(text)], Some(0.4))
    }

    fn settled(text: &str) -> RecognitionResult {
        RecognitionResult::settled(vec![RecognitionAlternative::new(text)])
    }

    fn transcripts(results: &[RecognitionResult]) -> Vec<&str> {
        results.iter().filter_map(|r| r.transcript()).collect()
    }

    #[test]
    fn test_interim_results_are_replaced() {
        let mut ledger = ResultLedger::new();
        ledger.apply_update(0, vec![interim("to")]).unwrap();
        ledger.apply_update(0, vec![interim("to be")]).unwrap();
        assert_eq!(transcripts(ledger.slots()), vec!["to be"]);
        assert_eq!(ledger.settled_len(), 0);
    }

    #[test]
    fn test_lower_index_keeps_prefix_and_replaces_tail() {
        let mut ledger = ResultLedger::new();
        ledger
            .apply_update(0, vec![interim("a"), interim("b"), interim("c")])
            .unwrap();
        ledger.apply_update(2, vec![interim("c2"), interim("d")]).unwrap();
        assert_eq!(transcripts(ledger.slots()), vec!["a", "b", "c2", "d"]);

        // A later update at a lower index drops everything from that index on.
        ledger.apply_update(1, vec![interim("B")]).unwrap();
        assert_eq!(transcripts(ledger.slots()), vec!["a", "B"]);
    }

    #[test]
    fn test_final_settles_and_interim_follows() {
        let mut ledger = ResultLedger::new();
        ledger.apply_update(0, vec![interim("to be")]).unwrap();
        let update = ledger
            .apply_update(0, vec![settled("to be"), interim("or not")])
            .unwrap();
        assert!(update.has_final());
        assert_eq!(ledger.settled_len(), 1);
        assert_eq!(transcripts(ledger.settled()), vec!["to be"]);
        assert_eq!(transcripts(ledger.interim()), vec!["or not"]);

        ledger.apply_update(1, vec![settled("or not to be")]).unwrap();
        assert_eq!(ledger.settled_len(), 2);
        assert!(ledger.interim().is_empty());
    }

    #[test]
    fn test_two_finals_rejected() {
        let mut ledger = ResultLedger::new();
        let result = ledger.apply_update(0, vec![settled("a"), settled("b")]);
        assert!(matches!(result, Err(SessionError::InvalidLedgerUpdate(_))));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_final_not_first_rejected() {
        let mut ledger = ResultLedger::new();
        let result = ledger.apply_update(0, vec![interim("a"), settled("b")]);
        assert!(matches!(result, Err(SessionError::InvalidLedgerUpdate(_))));
    }

    #[test]
    fn test_gap_rejected() {
        let mut ledger = ResultLedger::new();
        ledger.apply_update(0, vec![interim("a")]).unwrap();
        match ledger.apply_update(2, vec![interim("c")]) {
            Err(SessionError::InvalidLedgerUpdate(msg)) => assert!(msg.contains("gap")),
            other => panic!("expected InvalidLedgerUpdate, got {other:?}"),
        }
        // Appending right at the end is fine.
        ledger.apply_update(1, vec![interim("b")]).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_settled_slots_are_immutable() {
        let mut ledger = ResultLedger::new();
        ledger.apply_update(0, vec![settled("done")]).unwrap();
        match ledger.apply_update(0, vec![interim("rewrite")]) {
            Err(SessionError::InvalidLedgerUpdate(msg)) => assert!(msg.contains("settled")),
            other => panic!("expected InvalidLedgerUpdate, got {other:?}"),
        }
        assert_eq!(transcripts(ledger.slots()), vec!["done"]);
    }

    #[test]
    fn test_final_must_land_on_settled_boundary() {
        let mut ledger = ResultLedger::new();
        ledger.apply_update(0, vec![interim("a"), interim("b")]).unwrap();
        let result = ledger.apply_update(1, vec![settled("b")]);
        assert!(matches!(result, Err(SessionError::InvalidLedgerUpdate(_))));
    }

    #[test]
    fn test_final_drops_stability() {
        let mut ledger = ResultLedger::new();
        let mut result = settled("x");
        result.stability = Some(0.8);
        let update = ledger.apply_update(0, vec![result]).unwrap();
        assert_eq!(update.results[0].stability, None);
        assert_eq!(ledger.slots()[0].stability, None);
    }

    #[test]
    fn test_out_of_range_scores_rejected() {
        let mut ledger = ResultLedger::new();
        let bad = RecognitionResult::interim(vec![RecognitionAlternative::new("x")], Some(1.5));
        assert!(ledger.apply_update(0, vec![bad]).is_err());

        let bad = RecognitionResult::settled(vec![
            RecognitionAlternative::new("x").with_confidence(-0.1)
        ]);
        assert!(ledger.apply_update(0, vec![bad]).is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_empty_update_truncates() {
        let mut ledger = ResultLedger::new();
        ledger.apply_update(0, vec![settled("a"), interim("b")]).unwrap();
        ledger.apply_update(1, Vec::new()).unwrap();
        assert_eq!(transcripts(ledger.slots()), vec!["a"]);
    }

    #[test]
    fn test_index_beyond_wire_range_rejected() {
        let mut ledger = ResultLedger::new();
        let index = i32::MAX as usize + 1;
        match ledger.apply_update(index, vec![interim("x")]) {
            Err(SessionError::InvalidLedgerUpdate(msg)) => assert!(msg.contains("wire range")),
            other => panic!("expected InvalidLedgerUpdate, got {other:?}"),
        }
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_applied_update_carries_wire_index() {
        let mut ledger = ResultLedger::new();
        ledger.apply_update(0, vec![settled("a")]).unwrap();
        let update = ledger.apply_update(1, vec![interim("b")]).unwrap();
        assert_eq!(update.result_index, 1i32);
    }
}
