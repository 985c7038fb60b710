//! Prompt templates for the four LLM-backed stages, plus the single-call
//! baseline selector used by `evaluate`.

use crate::boundary::quiz::QuizItem;

pub const GOAL_SYSTEM_PROMPT: &str = "You are a vocabulary assistant. Read a learner's goal and decide whether it targets an exam (IELTS or GRE) and which topic it covers. Respond ONLY with a JSON object of the form {\"exam\": \"IELTS\" | \"GRE\" | null, \"topic\": string | null, \"keywords\": [string, ...]}. Keywords are single lower-case English words that describe the topic.";

pub const SELECT_SYSTEM_PROMPT: &str = "You are a vocabulary tutor choosing which words a learner should study today from a table of candidates. Each row is `word, CEFR level, memory score` where the memory score runs from 0 (unknown) to 1 (well remembered).";

pub const QUIZ_SYSTEM_PROMPT: &str = "You write vocabulary quizzes. Respond ONLY with a JSON object holding four arrays keyed \"multiple-choice\", \"matching\", \"short-answer\" and \"scenario-based\". Do not add other keys and do not wrap the JSON in a code block.";

pub const SCORE_SYSTEM_PROMPT: &str = "You grade a learner's answer to a vocabulary question. For every word the question tests, give an understanding level between 0 (no understanding) and 1 (perfect understanding). Respond ONLY with a JSON object mapping each word to its level.";

pub const BASELINE_SYSTEM_PROMPT: &str = "You are a vocabulary tutor. Given a learner's request and their whole vocabulary table, choose the words they should study next. Each row is `word, CEFR level, memory score, IELTS, GRE` where the memory score runs from 0 (unknown) to 1 (well remembered) and the exam columns are 1 for words on that exam's list. Respond ONLY with a JSON object of the form {\"words\": [string, ...]}.";

const QUIZ_FORMAT: &str = r#"Item formats:
- multiple-choice: {"word": "meticulous", "question": "Which word means 'very careful and precise'?", "choices": ["meticulous", "haphazard", "reckless", "indifferent"], "correct_option": "A"}
- matching: {"words": ["gregarious", "ambiguous"], "definitions": ["open to more than one interpretation", "fond of company"], "correct_matches": {"1": "B", "2": "A"}}
- short-answer: {"word": "obsolete", "question": "What does 'obsolete' mean?", "answer": "no longer in use"}
- scenario-based: {"word": "pragmatic", "scenario": "Your team must ship with a tight budget.", "question": "Describe a pragmatic approach.", "answer": "Focus on what works in practice."}"#;

pub fn goal_prompt(goal: &str) -> String {
    format!("Learner's goal: \"{}\"\n\nReturn the JSON object.", goal.trim())
}

pub fn selection_prompt(candidate_table: &str, k: usize) -> String {
    format!(
        "Recommend {k} words from the table below.\n\n\
         - Prefer words from A2 to B2, avoiding ones far too easy or too hard.\n\
         - Prefer words with low memory scores.\n\
         - Only use words that appear in the table.\n\n\
         Output exactly {k} words, one per line, with nothing else.\n\n\
         {candidate_table}"
    )
}

pub fn baseline_prompt(vocab_table: &str, goal: &str, k: usize) -> String {
    format!(
        "Select {k} words for this request: \"{}\"\n\n\
         Vocabulary table:\n{vocab_table}",
        goal.trim()
    )
}

pub fn quiz_prompt(words: &[String], num_questions: usize) -> String {
    format!(
        "Words: {}\n\n\
         Write exactly {num_questions} questions about these words only, mixing the four \
         question types. Matching questions use two or three words with their definitions \
         shuffled; `correct_matches` maps each word's 1-based position to the letter of its \
         definition.\n\n{QUIZ_FORMAT}",
        words.join(", ")
    )
}

pub fn scoring_prompt(item: &QuizItem, answer: &str) -> String {
    let words = item.words().join(", ");
    let expected = item
        .correct_answer()
        .unwrap_or_else(|| "(judge from the word's meaning)".to_string());
    format!(
        "Words tested: {words}\n\
         Question type: {}\n\
         Question: {}\n\
         Expected answer: {expected}\n\
         Learner's answer: {}\n\n\
         Return a JSON object with one key per tested word.",
        item.kind(),
        describe_question(item),
        answer.trim()
    )
}

fn describe_question(item: &QuizItem) -> String {
    match item {
        QuizItem::MultipleChoice(q) => {
            let choices = q
                .choices
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{}. {c}", option_letter(i)))
                .collect::<Vec<_>>()
                .join("  ");
            format!("{} {choices}", q.question)
        }
        QuizItem::Matching(q) => {
            let definitions = q
                .definitions
                .iter()
                .enumerate()
                .map(|(i, d)| format!("{}. {d}", option_letter(i)))
                .collect::<Vec<_>>()
                .join("  ");
            format!("Match each word to a definition: {definitions}")
        }
        QuizItem::ShortAnswer(q) => q.question.clone(),
        QuizItem::ScenarioBased(q) => format!("{} {}", q.scenario, q.question),
    }
}

/// "A" for 0, "B" for 1, and so on.
pub fn option_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}
