//! Default prompt templates.
//!
//! The plain pair only sees the current question. The history-aware pair
//! adds a `{conv_history}` variable and is only used when explicitly enabled.

/// Rewrites a question into a standalone question. Declares `{question}` only.
pub const STANDALONE_QUESTION: &str =
    "Given a question, convert it to a standalone question. question: {question} standalone question:";

/// History-aware rewrite. Declares `{conv_history}` and `{question}`.
pub const STANDALONE_QUESTION_WITH_HISTORY: &str = "Given some conversation history (if any) and a question, convert the question to a standalone question. \nconversation history: {conv_history}\nquestion: {question} \nstandalone question:";

/// Support-bot answer prompt. Declares `{context}` and `{question}`.
pub fn answer(product_name: &str, support_email: &str) -> String {
    format!(
        "You are a helpful and enthusiastic support bot who can answer a given question about {product} based on the context provided. Try to find the answer in the context. If you really don't know the answer, say \"I'm sorry, I don't know the answer to that.\" And direct the questioner to email {email}. Don't try to make up an answer. Always speak as if you were chatting to a friend.\ncontext: {{context}}\nquestion: {{question}}\nanswer: ",
        product = escape(product_name),
        email = escape(support_email),
    )
}

/// History-aware answer prompt. Declares `{context}`, `{conv_history}` and `{question}`.
pub fn answer_with_history(product_name: &str, support_email: &str) -> String {
    format!(
        "You are a helpful and enthusiastic support bot who can answer a given question about {product} based on the context provided and the conversation history. Try to find the answer in the context. If the answer is not given in the context, find the answer in the conversation history if possible. If you really don't know the answer, say \"I'm sorry, I don't know the answer to that.\" And direct the questioner to email {email}. Don't try to make up an answer. Always speak as if you were chatting to a friend.\ncontext: {{context}}\nconversation history: {{conv_history}}\nquestion: {{question}}\nanswer: ",
        product = escape(product_name),
        email = escape(support_email),
    )
}

/// Keep configured text from being read as placeholders.
fn escape(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}
