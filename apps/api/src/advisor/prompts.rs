use crate::models::chat::ChatMessageRow;

/// Persona for resume analysis.
pub const ANALYST_SYSTEM: &str = "You are an experienced HR professional with technical \
    expertise in roles such as Data Science, Data Analysis, DevOps, Machine Learning \
    Engineering, Prompt Engineering, AI Engineering, Full Stack Web Development, Big Data \
    Engineering, Marketing Analysis, Human Resource Management, and Software Development.";

/// Persona for the career-advice chat.
pub const ADVISOR_SYSTEM: &str = "You are a friendly, practical career advisor for software \
    engineers and students. Give concrete, actionable advice. Keep answers concise and \
    grounded in the user's situation; ask a clarifying question when the request is too \
    vague to answer usefully.";

/// Builds the resume-analysis prompt. The job-description comparison section
/// is appended only when one was provided.
pub fn build_analysis_prompt(resume_text: &str, job_description: Option<&str>) -> String {
    let mut prompt = format!(
        "Your task is to analyze the following resume:\n\n\
         Resume:\n{resume_text}\n\n\
         Please provide a structured evaluation covering:\n\
         - Overall alignment with common industry roles\n\
         - Strengths and weaknesses of the candidate\n\
         - Key skills they already have\n\
         - Skills they should improve or acquire\n\
         - Recommended courses to enhance their profile\n"
    );

    if let Some(jd) = job_description.filter(|jd| !jd.trim().is_empty()) {
        prompt.push_str(&format!(
            "\nAdditionally, compare this resume with the following job description and \
             highlight specific matches and gaps:\n\nJob Description:\n{jd}\n"
        ));
    }

    prompt
}

/// Builds the chat prompt from the stored transcript plus the new message.
/// `history` is expected oldest-first.
pub fn build_chat_prompt(history: &[ChatMessageRow], message: &str) -> String {
    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for exchange in history {
            prompt.push_str(&format!("User: {}\n", exchange.user_message));
            prompt.push_str(&format!("Advisor: {}\n", exchange.ai_response));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!("User: {message}\nAdvisor:"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn exchange(user: &str, ai: &str) -> ChatMessageRow {
        ChatMessageRow {
            id: 1,
            clerk_id: "user_123".to_string(),
            user_message: user.to_string(),
            ai_response: ai.to_string(),
            session_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_analysis_prompt_without_jd() {
        let prompt = build_analysis_prompt("John Doe, Rust developer", None);
        assert!(prompt.contains("John Doe, Rust developer"));
        assert!(!prompt.contains("Job Description:"));
    }

    #[test]
    fn test_analysis_prompt_with_jd() {
        let prompt = build_analysis_prompt("resume body", Some("Senior Rust Engineer"));
        assert!(prompt.contains("Job Description:\nSenior Rust Engineer"));
    }

    #[test]
    fn test_analysis_prompt_ignores_blank_jd() {
        let prompt = build_analysis_prompt("resume body", Some("   "));
        assert!(!prompt.contains("Job Description:"));
    }

    #[test]
    fn test_chat_prompt_without_history() {
        let prompt = build_chat_prompt(&[], "How do I prepare for interviews?");
        assert!(prompt.starts_with("User: How do I prepare"));
        assert!(!prompt.contains("Conversation so far"));
    }

    #[test]
    fn test_chat_prompt_includes_transcript_in_order() {
        let history = vec![
            exchange("What should I learn first?", "Start with data structures."),
            exchange("And after that?", "Practice system design."),
        ];
        let prompt = build_chat_prompt(&history, "Any book recommendations?");
        let first = prompt.find("What should I learn first?").unwrap();
        let second = prompt.find("And after that?").unwrap();
        let last = prompt.find("Any book recommendations?").unwrap();
        assert!(first < second && second < last);
    }
}
