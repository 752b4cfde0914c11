use std::fmt;

/// Pipeline stage of the relay session. Exactly one stage is active at
/// a time; the session is the sole writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Listening,
    Recording,
    Transcribing,
    Publishing,
    Synthesizing,
    Playing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Listening => "listening",
            PipelineStage::Recording => "recording",
            PipelineStage::Transcribing => "transcribing",
            PipelineStage::Publishing => "publishing",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Playing => "playing",
        };
        f.write_str(name)
    }
}
