//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Question, QuizMode, Target, Topic, VocabWord, WrongAnswerRecord};
use crate::logic::{AnswerOutcome, AnswerStatus};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Quiz {
        topic: Topic,
        count: Option<usize>,
        mode: Option<QuizMode>,
    },
    SubmitAnswer {
        #[serde(rename = "questionId")]
        question_id: Uuid,
        answer: String,
    },
    Abandon {
        #[serde(rename = "questionId")]
        question_id: Uuid,
    },
    OverrideCorrect {
        #[serde(rename = "recordId")]
        record_id: String,
    },
    LessonComplete {
        unit: u32,
    },
    Review,
    ToggleMastered {
        #[serde(rename = "wordId")]
        word_id: u32,
    },
    Reset,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Quiz {
        questions: Vec<QuestionOut>,
    },
    AnswerResult {
        status: &'static str,
        correct: bool,
        expected: String,
        similarity: Option<f64>,
        #[serde(rename = "editDistance")]
        edit_distance: Option<usize>,
    },
    Abandoned {
        removed: bool,
    },
    Overridden {
        applied: bool,
    },
    LessonComplete {
        #[serde(rename = "recentUnits")]
        recent_units: Vec<u32>,
    },
    Review {
        records: Vec<WrongAnswerRecord>,
    },
    MasteredToggled {
        word: Option<VocabWord>,
    },
    ResetDone,
    Error {
        message: String,
    },
}

/// DTO used by both WS and HTTP for question delivery. The canonical answer
/// and the accepted set stay server-side; the client learns the expected
/// answer only from the judgement response.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: Uuid,
    pub topic: Topic,
    pub prompt: String,
    pub options: Vec<String>,
    pub mode: QuizMode,
    pub target: Target,
}

/// Convert a full `Question` (internal) to the public DTO.
pub fn to_out(q: &Question) -> QuestionOut {
    QuestionOut {
        id: q.id,
        topic: q.topic,
        prompt: q.prompt.clone(),
        options: q.options.clone(),
        mode: q.mode,
        target: q.target,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct QuizQuery {
    pub topic: Topic,
    pub count: Option<usize>,
    pub mode: Option<QuizMode>,
}

#[derive(Serialize)]
pub struct QuizOut {
    pub questions: Vec<QuestionOut>,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    #[serde(rename = "questionId")]
    pub question_id: Uuid,
    pub answer: String,
}
#[derive(Serialize)]
pub struct AnswerOut {
    /// "ok" when judged; "stale" when the question was no longer pending.
    pub status: &'static str,
    pub correct: bool,
    pub expected: String,
    pub similarity: Option<f64>,
    #[serde(rename = "editDistance")]
    pub edit_distance: Option<usize>,
}

impl From<AnswerOutcome> for AnswerOut {
    fn from(o: AnswerOutcome) -> Self {
        AnswerOut {
            status: match o.status {
                AnswerStatus::Judged => "ok",
                AnswerStatus::Stale => "stale",
            },
            correct: o.verdict.correct,
            expected: o.expected,
            similarity: o.verdict.similarity,
            edit_distance: o.verdict.edit_distance,
        }
    }
}

#[derive(Deserialize)]
pub struct AbandonIn {
    #[serde(rename = "questionId")]
    pub question_id: Uuid,
}
#[derive(Serialize)]
pub struct AbandonOut {
    pub removed: bool,
}

#[derive(Deserialize)]
pub struct OverrideIn {
    #[serde(rename = "recordId")]
    pub record_id: String,
}
#[derive(Serialize)]
pub struct OverrideOut {
    pub applied: bool,
}

#[derive(Deserialize)]
pub struct LessonCompleteIn {
    pub unit: u32,
}
#[derive(Serialize)]
pub struct LessonCompleteOut {
    #[serde(rename = "recentUnits")]
    pub recent_units: Vec<u32>,
}

#[derive(Serialize)]
pub struct ReviewOut {
    pub records: Vec<WrongAnswerRecord>,
}

#[derive(Deserialize)]
pub struct MasteredToggleIn {
    #[serde(rename = "wordId")]
    pub word_id: u32,
}
#[derive(Serialize)]
pub struct MasteredToggleOut {
    pub word: Option<VocabWord>,
}

#[derive(Serialize)]
pub struct MasteredOut {
    pub words: Vec<VocabWord>,
}

#[derive(Serialize)]
pub struct OkOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
