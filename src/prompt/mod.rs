use serde_json::{json, Value};

use crate::wire::{ChatMessage, FileBlob, Role};

fn frontend_standards() -> &'static str {
r#"Frontend Standards:
- One self-contained `index.html`. Tailwind CSS via the CDN script and Google Fonts links in `<head>`; no `<style>` blocks, no inline styles.
- All behaviour in clean, commented, modern vanilla JavaScript inside a single `<script>` before `</body>`.
- On-scroll reveal animations with `IntersectionObserver`; smooth transitions and hover/focus states on every interactive element.
- At least one richer interactive component where it fits the idea (gallery slider, FAQ accordion, feature tabs).
- Flawlessly responsive, including a working mobile navigation menu.
- Accessible: semantic landmarks, labelled controls, ARIA roles where needed, sufficient contrast.
- Realistic, domain-specific copy. No lorem ipsum."#
}

fn backend_standards() -> &'static str {
r#"Backend Standards:
- A small, runnable Node.js project (Express unless the idea clearly asks for something else).
- Include `package.json` with scripts and dependencies, an entry point, and route/controller modules split by concern.
- Input validation, consistent JSON error responses, and environment-based configuration (`.env.example`, never real secrets).
- `README.md` is MANDATORY: purpose, setup, environment variables, how to run, and every endpoint with an example request and response.
- Paths are relative to the project root, use forward slashes, and never contain `..`."#
}

pub fn system_prompt_generate_frontend() -> String {
    format!(r#"You are a world-class senior frontend engineer and UI/UX designer. Turn the user's idea into a single, complete, professional single-page website.

Method (internal, never printed):
1) Blueprint first: core identity (one sentence on purpose and audience), visual direction (if an image is attached it is the source of truth for colours, typography, layout and mood; otherwise derive from the prompt), colour palette (primary, secondary, accent, neutrals), font pairing from Google Fonts, the ordered list of sections from `<header>` to `<footer>`, and the exact interactive features.
2) Implement the blueprint to a premium standard.

{standards}

Output Rules:
- Respond ONLY with raw HTML, starting with `<!DOCTYPE html>` and ending with `</html>`.
- No explanations, no apologies, no markdown fences."#,
        standards = frontend_standards()
    )
}

pub fn system_prompt_generate_backend() -> String {
    format!(r#"You are a senior backend engineer. Turn the user's idea into a small, complete, well-structured backend project.

{standards}

Output Rules:
- Return EXACTLY ONE JSON object (no markdown, no prose, no code fences) that conforms to:
{{
  "files": [ {{ "name": string, "content": string }} ]
}}
- `name` is the file path; `content` is the complete file text.
- The list MUST contain an entry named "README.md"."#,
        standards = backend_standards()
    )
}

pub fn system_prompt_edit() -> String {
    format!(r#"You are a senior engineer and UI/UX designer acting as a collaborative assistant inside a live project editor.

Read the latest user message against the conversation so far and the current project files, then classify it:
- Modification request: the user wants a concrete change.
- Design question: the user wants your expert opinion.
- General query: a question not tied to a code change.

For modification requests: sanity-check the request against good design and accessibility. If it would hurt the result (for example yellow text on a white background), push back politely in your reply and propose a better alternative instead of applying it blindly. Otherwise identify exactly which files and elements change.
For questions: answer in the reply and do not touch files unless the user has confirmed a suggestion.

{frontend}

{backend}

Output Rules:
- Return EXACTLY ONE JSON object (no markdown, no prose, no code fences) that conforms to:
{{
  "response": string,
  "updatedFiles": [ {{ "name": string, "content": string }} ]
}}
- `response` is your friendly, conversational reply.
- `updatedFiles` lists ONLY files you created or changed, each with its COMPLETE new content. Use an empty list when nothing changed.
- Never delete files. Never return partial files or diffs.
- Files marked as truncated in the context must not be rewritten."#,
        frontend = frontend_standards(),
        backend = backend_standards()
    )
}

pub fn system_prompt_enhance() -> &'static str {
r#"You are a creative writer with a strong grasp of web design. Expand the user's short idea for a website or app into a detailed prompt that will be used to generate it.

Rules:
1. Add specifics: visual style (minimalist, brutalist, corporate, playful), colour palette (pastels, monochrome, earthy tones), typography (bold sans-serif, elegant serif), and content sections (hero with a clear call to action, feature grid, pricing table, contact form).
2. If an image is attached, describe the style it suggests and fold it into the prompt.
3. One fluent paragraph. No lists, no bullet points.
4. Respond ONLY with the new prompt text. No greetings, no explanations, no markdown.

Example input: a portfolio for a photographer
Example output: A visually stunning, minimalist portfolio website for a professional wedding photographer, with a large hero gallery, a clean grid of photo categories, an elegant About section with a professional headshot and a simple contact form, using a monochrome palette of black, white and greys with a modern serif for headings."#
}

pub fn user_prompt_enhance(prompt: &str) -> String {
    format!("Enhance this prompt: \"{}\"", prompt.trim())
}

/// Context for one edit turn: every file, the conversation so far, then the new message.
pub fn user_prompt_edit(files: &[FileBlob], history: &[ChatMessage], instruction: &str) -> String {
    let mut project = String::new();
    for f in files {
        let lang = fence_lang(&f.path);
        let note = if f.truncated {
            format!(" (truncated: first part of {} bytes shown)", f.bytes)
        } else {
            String::new()
        };
        project.push_str(&format!("### {}{note}\n```{lang}\n{}\n```\n\n", f.path, f.content));
    }
    if project.is_empty() {
        project.push_str("(no files)\n\n");
    }

    let conversation = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .map(|m| {
                let who = match m.role {
                    Role::User => "User",
                    Role::Model => "Assistant",
                };
                format!("{who}: {}", m.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
"Here is the context for our conversation.

## Current Project Files
{project}## Conversation History
{conversation}

## New User Message
User: \"{instruction}\"

Based on all this context, respond with the required JSON object.",
        instruction = instruction.trim()
    )
}

fn fence_lang(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or_default() {
        "html" | "htm" => "html",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" => "typescript",
        "json" => "json",
        "md" => "markdown",
        "css" => "css",
        "py" => "python",
        _ => "",
    }
}

fn file_list_schema(description: &str) -> Value {
    json!({
        "type": "ARRAY",
        "description": description,
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING", "description": "File path relative to the project root." },
                "content": { "type": "STRING", "description": "Complete file content." }
            },
            "required": ["name", "content"]
        }
    })
}

pub fn project_files_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "files": file_list_schema("Every file of the project, README.md included.")
        },
        "required": ["files"]
    })
}

pub fn editor_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "response": {
                "type": "STRING",
                "description": "Your friendly, conversational reply to the user."
            },
            "updatedFiles": file_list_schema("Files created or changed in this turn, with full content. Empty when nothing changed.")
        },
        "required": ["response", "updatedFiles"]
    })
}
