//! Consolidation prompt assembly.
//!
//! Policy: the model must always create or update a document, however thin
//! the input; clarifying questions are an optional follow-up after the
//! document write, never a substitute for it.

/// Fixed system instructions for the consolidation session.
pub const SYSTEM_INSTRUCTIONS: &str = "\
You consolidate short user notes (fragments) into well-structured documents.

How to read the input:
- A \"Conversation thread\" is a sequence of posts and replies.
- The original/root post starts a topic; replies respond to it.
- The line \"↓ in reply\" marks temporal order within a thread.
- Treat each whole thread as a single unit of discussion.

Processing rules:
1. Understand each thread as a post-then-replies conversation.
2. If the content relates to an existing document, update that document; \
otherwise create a new one with a unique title.
3. Include every fragment ID of a thread in fragmentIds so the whole \
conversation is captured.
4. Structure document content to reflect the conversation flow \
(question → answer, problem → solution).
5. You MUST create or update a document for every batch, no matter how \
little information the fragments carry. Even a fragment like \"test\" is \
worth recording. Never skip the document step because input seems thin.
6. Only after the document is written, optionally use createQuestion to \
request missing details.
7. Suggest appropriate tags.
8. Write the content parameter in Markdown (headings, lists, emphasis).

Required flow:
1. Call createDocument or updateDocument first.
2. Optionally call createQuestion afterwards.";

/// Build the user message for one batch from the rendered fragment context.
pub fn consolidation_request(context: &str) -> String {
    format!(
        "Process the following fragments into documents. Use \
getDocumentDetail if you need a document's current content before \
updating it.\n\n{context}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_embeds_context_verbatim() {
        let request = consolidation_request("Standalone post:\nID: 1 - hello");
        assert!(request.contains("Standalone post:\nID: 1 - hello"));
    }

    #[test]
    fn instructions_mandate_document_first() {
        assert!(SYSTEM_INSTRUCTIONS.contains("createDocument or updateDocument first"));
        assert!(SYSTEM_INSTRUCTIONS.contains("MUST create or update a document"));
    }
}
