//! Question bank and set construction
//!
//! Static prompt catalog keyed by interview type and topic, plus the
//! deterministic selection that turns a [`SessionConfig`] into the ordered
//! question list for one session.

use crate::types::{Difficulty, InterviewType, SessionConfig};

const BEHAVIORAL_COMMUNICATION: &[&str] = &[
    "Tell me about a time you had to explain a complex idea to a non-technical stakeholder.",
    "Describe a situation where you handled a misunderstanding in a team.",
    "Share an example of receiving critical feedback and how you acted on it.",
    "Describe a time you had to influence someone without authority.",
    "How do you keep communication clear under pressure?",
];

const BEHAVIORAL_PRODUCT: &[&str] = &[
    "Tell me about a product decision you disagreed with and how you handled it.",
    "Describe a time you prioritized between competing roadmap requests.",
    "How did you use customer feedback to improve a product outcome?",
    "Share an example where a product experiment failed and what you learned.",
    "Describe how you align engineering, design, and business stakeholders.",
];

const BEHAVIORAL_GENERAL: &[&str] = &[
    "Tell me about a time you solved a difficult problem under tight timelines.",
    "Describe a conflict in your team and how you resolved it.",
    "Give an example of a project where you took ownership end-to-end.",
    "What is a recent professional setback and what changed after it?",
    "Describe a situation where you had to adapt quickly to change.",
];

const TECHNICAL_JAVASCRIPT: &[&str] = &[
    "Explain event loop behavior and how you would debug async timing issues.",
    "How do `var`, `let`, and `const` differ in scope and runtime behavior?",
    "Describe how you optimize frontend performance in a large SPA.",
    "What are common memory leak causes in JavaScript apps and how do you prevent them?",
    "Explain a real bug you solved in JS and your debugging strategy.",
];

const TECHNICAL_REACT: &[&str] = &[
    "How do you decide when to split components and lift state?",
    "Explain how React rendering works and when memoization helps.",
    "Describe your approach to handling side effects and data fetching.",
    "How do you design reusable hooks and avoid hidden coupling?",
    "Tell me about a React performance issue you diagnosed and fixed.",
];

const TECHNICAL_PYTHON: &[&str] = &[
    "Explain Python's GIL and when multiprocessing is preferred over threading.",
    "How would you design a robust API client with retries and backoff in Python?",
    "Describe how you profile and optimize a slow Python function.",
    "How do you structure Python projects for maintainability and testing?",
    "Tell me about a production bug you fixed in Python and your root-cause process.",
];

const TECHNICAL_GENERAL: &[&str] = &[
    "Walk me through a system or feature you built and key technical tradeoffs.",
    "How do you break down ambiguous technical requirements into implementation steps?",
    "Describe your approach to writing maintainable and testable code.",
    "Tell me about a hard production issue and how you diagnosed it.",
    "How do you evaluate technical debt against delivery timelines?",
];

const HR_COMMUNICATION: &[&str] = &[
    "How would your previous manager describe your communication style?",
    "Tell me about a time you had to de-escalate a difficult conversation.",
    "How do you collaborate with teammates who work very differently from you?",
    "Describe how you prepare for important stakeholder conversations.",
    "What does professional accountability mean to you?",
];

const HR_GENERAL: &[&str] = &[
    "Tell me about yourself and what kind of role environment helps you perform best.",
    "Why are you interested in this role at this stage of your career?",
    "What are your top strengths and where are you actively improving?",
    "Describe a time you showed leadership without formal authority.",
    "What are your 12-month career goals and how does this role support them?",
];

/// Topic list for an interview type, unknown topics fall back to that type's
/// general pool
fn topic_pool(interview_type: InterviewType, topic: &str) -> &'static [&'static str] {
    match interview_type {
        InterviewType::Behavioral => match topic {
            "communication" => BEHAVIORAL_COMMUNICATION,
            "product" => BEHAVIORAL_PRODUCT,
            _ => BEHAVIORAL_GENERAL,
        },
        InterviewType::Technical => match topic {
            "javascript" => TECHNICAL_JAVASCRIPT,
            "react" => TECHNICAL_REACT,
            "python" => TECHNICAL_PYTHON,
            _ => TECHNICAL_GENERAL,
        },
        InterviewType::Hr => match topic {
            "communication" => HR_COMMUNICATION,
            _ => HR_GENERAL,
        },
    }
}

/// Difficulty framing applied to a question after topic customization
fn apply_difficulty(question: String, difficulty: Difficulty) -> String {
    match difficulty {
        Difficulty::Hard => {
            format!("Hard follow-up: {question} Include tradeoffs, risks, and measurable impact.")
        }
        Difficulty::Easy => {
            format!("Foundational: {question} Keep your answer clear and concise.")
        }
        Difficulty::Medium => question,
    }
}

/// Build the ordered question set for one session.
///
/// Deterministic: item `i` comes from the topic pool at `i % pool_len`, so a
/// `question_count` past the pool size wraps around. A custom topic appends a
/// focus sentence before difficulty framing.
pub fn build_question_set(config: &SessionConfig) -> Vec<String> {
    let pool = topic_pool(config.interview_type, &config.topic);

    (0..config.question_count as usize)
        .map(|i| {
            let mut question = pool[i % pool.len()].to_string();
            if let Some(custom) = &config.custom_topic {
                question = format!("{question} Focus this answer on {custom}.");
            }
            apply_difficulty(question, config.difficulty)
        })
        .collect()
}
