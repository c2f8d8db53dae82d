use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dialog::FormSchema;
use crate::error::ValidationErrors;
use crate::models::{QuestionType, Survey, SurveyQuestion};
use crate::validation;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyForm {
    pub title: String,
    pub description: String,
    pub end_date: String,
    pub questions: Vec<SurveyQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPayload {
    pub title: String,
    pub description: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
    pub questions: Vec<SurveyQuestion>,
}

/// Parses the one-line question syntax `[*]TYPE|content[|opt1;opt2;...]`.
/// A leading `*` marks the question as required.
pub fn parse_question(line: &str) -> Result<SurveyQuestion, String> {
    let line = line.trim();
    let (required, line) = match line.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let mut parts = line.splitn(3, '|');
    let question_type: QuestionType = parts.next().unwrap_or_default().parse()?;
    let content = parts
        .next()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| format!("`{line}` has no question text"))?
        .to_string();
    let options = parts
        .next()
        .map(|raw| {
            raw.split(';')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(SurveyQuestion {
        id: None,
        content,
        question_type,
        options,
        required,
    })
}

impl SurveyForm {
    pub fn add_question(&mut self, line: &str) -> Result<(), String> {
        self.questions.push(parse_question(line)?);
        Ok(())
    }
}

impl FormSchema for SurveyForm {
    type Entity = Survey;
    type Payload = SurveyPayload;

    fn from_entity(survey: &Survey) -> Self {
        Self {
            title: survey.title.clone(),
            description: survey.description.clone().unwrap_or_default(),
            end_date: survey
                .end_date
                .as_ref()
                .map(validation::format_datetime)
                .unwrap_or_default(),
            questions: survey.questions.clone(),
        }
    }

    fn validate(&self) -> Result<SurveyPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let title = errors.check("title", validation::required(&self.title));
        let end_date = match validation::optional(&self.end_date) {
            Some(raw) => errors.check("endDate", validation::datetime(&raw)),
            None => None,
        };

        if self.questions.is_empty() {
            errors.add("questions", "add at least one question");
        }
        for (index, question) in self.questions.iter().enumerate() {
            let number = index + 1;
            if question.content.trim().is_empty() {
                errors.add("questions", format!("question {number} has no content"));
            }
            if question.question_type.has_options() && question.options.len() < 2 {
                errors.add(
                    "questions",
                    format!("question {number} needs at least two options"),
                );
            }
        }

        match title {
            Some(title) if errors.is_empty() => Ok(SurveyPayload {
                title,
                description: validation::optional(&self.description),
                end_date,
                questions: self.questions.clone(),
            }),
            _ => Err(errors),
        }
    }
}
