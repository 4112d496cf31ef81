use serde::{Deserialize, Serialize};

/// Defines the phases a single trial moves through
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    /// Whether responses are collected while this phase is on screen.
    fn allows_input(&self) -> bool;
    fn next(&self) -> Option<Self>;

    fn is_done(&self) -> bool {
        self.next().is_none()
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum TrialPhase {
    #[default]
    Fixation,
    Cue,
    PreStimulus,
    StimulusResponse,
    Feedback,
    InterTrialInterval,
    Done,
}

impl Phase for TrialPhase {
    fn allows_input(&self) -> bool {
        matches!(self, Self::StimulusResponse)
    }

    fn next(&self) -> Option<Self> {
        use TrialPhase::*;
        Some(match self {
            Fixation => Cue,
            Cue => PreStimulus,
            PreStimulus => StimulusResponse,
            StimulusResponse => Feedback,
            Feedback => InterTrialInterval,
            InterTrialInterval => Done,
            Done => return None,
        })
    }
}

impl TrialPhase {
    pub fn label(&self) -> &'static str {
        match self {
            TrialPhase::Fixation => "fixation",
            TrialPhase::Cue => "cue",
            TrialPhase::PreStimulus => "pre-stimulus",
            TrialPhase::StimulusResponse => "stimulus-response",
            TrialPhase::Feedback => "feedback",
            TrialPhase::InterTrialInterval => "iti",
            TrialPhase::Done => "done",
        }
    }
}

/// Practice blocks get feedback and are never recorded.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialType {
    Practice,
    Main,
}

impl TrialType {
    pub fn is_practice(&self) -> bool {
        matches!(self, TrialType::Practice)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrialType::Practice => "practice",
            TrialType::Main => "main",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_run_forward_and_terminate() {
        let mut seen = vec![TrialPhase::default()];
        let mut phase = TrialPhase::default();
        while let Some(next) = phase.next() {
            assert!(!seen.contains(&next), "{next:?} revisited");
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen.len(), 7);
        assert!(phase.is_done());
    }

    #[test]
    fn only_stimulus_phase_takes_input() {
        let mut phase = TrialPhase::Fixation;
        let mut accepting = Vec::new();
        loop {
            if phase.allows_input() {
                accepting.push(phase);
            }
            match phase.next() {
                Some(p) => phase = p,
                None => break,
            }
        }
        assert_eq!(accepting, vec![TrialPhase::StimulusResponse]);
    }
}
