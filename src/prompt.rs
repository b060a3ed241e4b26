use serde::Deserialize;

use crate::config::ReviewSettings;

/// One issue category the model is asked to look for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChecklistItem {
    pub title: String,
    pub guidance: String,
}

impl ChecklistItem {
    fn new(title: &str, guidance: &str) -> Self {
        Self {
            title: title.to_string(),
            guidance: guidance.to_string(),
        }
    }
}

const ROLE: &str = "You are an **Apex Code Review AI** specialized in analyzing pull requests \
for best practices, governor limits, and security risks.";

const OBJECTIVE: &str = "**Objective:**
- Review the entire code thoroughly before making judgments.
- Identify potential issues and suggest improvements.
- If no issues are found, explicitly state that the code follows best practices.";

const RESPONSE_FORMAT: &str = "**Response Format:**
```
[file_name.cls]
Line [line_number]: [Issue Type] - [Description]
Suggestion: [Possible Fix]
Severity: [Error or Warning]
```";

const INSTRUCTIONS: &str = "**Instructions:**
- Carefully examine each line of code for the issues listed above.
- Provide a detailed analysis, specifying the line number, the type of issue and its severity.
- Offer clear and actionable suggestions for improvement.
- Ensure your response is structured and easy to understand.
- Classify every finding as Error (blocking) or Warning (advisory).
- Group the findings by severity, Errors first.";

/// The review instructions sent for every file. The diff is the only part
/// that changes between calls.
#[derive(Debug, Clone)]
pub struct ReviewTemplate {
    checklist: Vec<ChecklistItem>,
}

impl Default for ReviewTemplate {
    fn default() -> Self {
        Self {
            checklist: default_checklist(),
        }
    }
}

/// Apex issue categories reviewed when the settings file names none.
pub fn default_checklist() -> Vec<ChecklistItem> {
    vec![
        ChecklistItem::new(
            "SOQL inside `for` loops",
            "Avoid SOQL queries inside loops to prevent governor limit errors.",
        ),
        ChecklistItem::new(
            "Unsecured SOQL queries",
            "Ensure queries have proper filtering and sharing enforcement to avoid security risks.",
        ),
        ChecklistItem::new(
            "Unbulkified DML operations",
            "Optimize DML statements for large datasets to prevent governor limit errors.",
        ),
        ChecklistItem::new(
            "Hardcoded IDs",
            "Avoid hardcoding record IDs; fetch them dynamically instead.",
        ),
        ChecklistItem::new(
            "Improper use of `@AuraEnabled`",
            "Ensure exposed methods are secured and properly scoped.",
        ),
        ChecklistItem::new(
            "Excessive CPU time usage",
            "Avoid deep nesting and unnecessary computations to reduce CPU time.",
        ),
    ]
}

impl ReviewTemplate {
    pub fn new(checklist: Vec<ChecklistItem>) -> Self {
        Self { checklist }
    }

    pub fn from_settings(settings: &ReviewSettings) -> Self {
        match &settings.checklist {
            Some(items) if !items.is_empty() => Self::new(items.clone()),
            _ => Self::default(),
        }
    }

    pub fn checklist(&self) -> &[ChecklistItem] {
        &self.checklist
    }

    /// Render the full prompt for one file. `diff` is inserted verbatim.
    pub fn render(&self, diff: &str) -> String {
        let mut prompt = String::with_capacity(2048 + diff.len());
        prompt.push_str(ROLE);
        prompt.push_str("\n\n");
        prompt.push_str(OBJECTIVE);
        prompt.push_str("\n\n**Common Apex Issues to Detect:**\n");
        for (i, item) in self.checklist.iter().enumerate() {
            prompt.push_str(&format!("{}. **{}** - {}\n", i + 1, item.title, item.guidance));
        }
        prompt.push('\n');
        prompt.push_str(RESPONSE_FORMAT);
        prompt.push_str("\n\n**Pull Request Data:**\n");
        prompt.push_str(diff);
        prompt.push_str("\n\n");
        prompt.push_str(INSTRUCTIONS);
        prompt.push('\n');
        prompt
    }
}
