//! Prompt templates for the analysis agent

/// Failed code to show the generator when regenerating.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    pub code: &'a str,
    pub error: &'a str,
    /// What the planner thinks went wrong
    pub note: Option<&'a str>,
}

/// Templates for planner, code generation and report prompts
pub struct AnalysisPromptTemplate;

impl AnalysisPromptTemplate {
    /// System prompt for the planner that picks tool calls
    pub fn planner_system() -> &'static str {
        r#"You are a data analysis assistant. You answer questions about the user's datasets by calling tools, one call at a time.

## Workflow

1. Inspect the dataset with `get_dataset_schema` and load it with `parse_dataset`.
2. Call `generate_analysis_code` with a precise goal. The generated code is stored in the session.
3. Call `execute_analysis_code` to run the stored code. You never pass code yourself.
4. If execution fails, call `generate_analysis_code` again with `previous_error` describing what went wrong.
5. Optionally call `generate_report` to turn the result into prose.
6. Finish with `final_answer`.

## Rules

- If the request is ambiguous (which dataset, which column, which period), call `ask_for_clarification` instead of guessing.
- Tool errors of kind INVALID_ARGUMENT or PREREQUISITE_MISSING mean you should fix the call or run the missing step first.
- Keep the final answer short and grounded in the execution result."#
    }

    /// First user message of a turn
    pub fn planner_user(user_message: &str, answers_clarification: Option<&str>) -> String {
        match answers_clarification {
            Some(question) => format!(
                "You previously asked: {}\n\nThe user replied: {}",
                question, user_message
            ),
            None => user_message.to_string(),
        }
    }

    /// System prompt for analysis code generation
    pub fn code_system() -> &'static str {
        r#"You write Lua 5.4 analysis code that runs in a restricted sandbox.

The sandbox provides:
- `data`: an array of rows; each row is a table keyed by column name. Missing values are nil.
- `set_result(value)`: publishes the answer. Call it exactly once with plain data (numbers, strings, booleans, tables).
- `log(...)`: writes a diagnostic line.

Available libraries: table, string, math, utf8. There is no io, os, require, load, pcall or coroutine.

Reply with a single ```lua fenced code block and nothing else."#
    }

    /// User prompt for analysis code generation
    pub fn code_request(
        goal: &str,
        dataset_id: &str,
        schema_context: &str,
        retry: Option<RetryContext<'_>>,
    ) -> String {
        let mut prompt = format!(
            "Dataset: {}\n{}\n\nGoal: {}\n",
            dataset_id, schema_context, goal
        );

        if let Some(retry) = retry {
            prompt.push_str(&format!(
                "\nThe previous attempt failed.\n\n```lua\n{}\n```\n\nError:\n{}\n",
                retry.code, retry.error
            ));
            if let Some(note) = retry.note
                && note != retry.error
            {
                prompt.push_str(&format!("\nPlanner note: {}\n", note));
            }
            prompt.push_str("\nWrite corrected code.\n");
        }

        prompt
    }

    /// System prompt for report generation
    pub fn report_system() -> &'static str {
        r#"You write short analytical reports for business users.
Explain what the numbers show in plain language. Do not invent figures that are not in the result.
Use at most three paragraphs."#
    }

    /// User prompt for report generation
    pub fn report_request(dataset_id: &str, focus: Option<&str>, result_summary: &str) -> String {
        let focus = focus
            .map(|f| format!("Focus on: {}\n\n", f))
            .unwrap_or_default();
        format!(
            "Dataset: {}\n\n{}Analysis result (JSON):\n{}\n",
            dataset_id, focus, result_summary
        )
    }
}
