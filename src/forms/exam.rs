use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::dialog::FormSchema;
use crate::error::{AdminError, ValidationErrors};
use crate::models::{Exam, ExamQuestion};
use crate::validation;

const ANSWER_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

#[derive(Debug, Clone, PartialEq)]
pub struct ExamForm {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub passing_score: String,
    pub max_attempts: String,
    pub is_active: bool,
    pub questions: Vec<ExamQuestion>,
}

impl Default for ExamForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            duration: "30".to_string(),
            passing_score: "50".to_string(),
            max_attempts: "1".to_string(),
            is_active: false,
            questions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPayload {
    pub title: String,
    pub description: Option<String>,
    pub duration: u32,
    pub passing_score: u32,
    pub max_attempts: u32,
    pub is_active: bool,
    pub questions: Vec<ExamQuestion>,
}

/// One line of a question import/export file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow {
    content: String,
    option_a: String,
    option_b: String,
    #[serde(default)]
    option_c: String,
    #[serde(default)]
    option_d: String,
    correct_answer: String,
    #[serde(default)]
    points: Option<u32>,
}

impl ExamForm {
    pub fn add_question(&mut self, question: ExamQuestion) {
        self.questions.push(question);
    }

    pub fn remove_question(&mut self, index: usize) -> Option<ExamQuestion> {
        (index < self.questions.len()).then(|| self.questions.remove(index))
    }

    /// Moves the question at `from` so it ends up at `to`.
    pub fn move_question(&mut self, from: usize, to: usize) -> bool {
        let len = self.questions.len();
        if from >= len || to >= len {
            return false;
        }
        let question = self.questions.remove(from);
        self.questions.insert(to, question);
        true
    }

    /// Appends the questions of a CSV file with the columns
    /// `content,optionA,optionB,optionC,optionD,correctAnswer,points`.
    /// Nothing is appended unless every row parses.
    pub fn import_csv(&mut self, input: impl Read) -> Result<usize, AdminError> {
        let mut reader = csv::Reader::from_reader(input);
        let mut imported = Vec::new();

        for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
            let row = result?;
            imported.push(question_from_row(row).map_err(|message| {
                AdminError::Csv(format!("row {}: {message}", index + 1))
            })?);
        }

        let count = imported.len();
        for question in imported {
            self.add_question(question);
        }
        Ok(count)
    }

    pub fn export_csv(&self, output: impl Write) -> Result<(), AdminError> {
        let mut writer = csv::Writer::from_writer(output);
        for question in &self.questions {
            let option = |i: usize| question.options.get(i).cloned().unwrap_or_default();
            let letter = ANSWER_LETTERS
                .get(question.correct_answer)
                .map(|c| c.to_string())
                .unwrap_or_default();
            writer.serialize(CsvRow {
                content: question.content.clone(),
                option_a: option(0),
                option_b: option(1),
                option_c: option(2),
                option_d: option(3),
                correct_answer: letter,
                points: Some(question.points),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn question_from_row(row: CsvRow) -> Result<ExamQuestion, String> {
    let content = validation::required(&row.content).map_err(|e| format!("content {e}"))?;
    let options: Vec<String> = [row.option_a, row.option_b, row.option_c, row.option_d]
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if options.len() < 2 {
        return Err("needs at least two options".to_string());
    }

    let letter = row.correct_answer.trim().to_ascii_uppercase();
    let correct_answer = ANSWER_LETTERS
        .iter()
        .position(|c| letter.len() == 1 && letter.starts_with(*c))
        .filter(|i| *i < options.len())
        .ok_or_else(|| format!("correct answer `{}` does not name an option", row.correct_answer))?;

    Ok(ExamQuestion {
        id: None,
        content,
        options,
        correct_answer,
        points: row.points.unwrap_or(1),
    })
}

impl FormSchema for ExamForm {
    type Entity = Exam;
    type Payload = ExamPayload;

    fn from_entity(exam: &Exam) -> Self {
        Self {
            title: exam.title.clone(),
            description: exam.description.clone().unwrap_or_default(),
            duration: exam.duration.to_string(),
            passing_score: exam.passing_score.to_string(),
            max_attempts: exam.max_attempts.to_string(),
            is_active: exam.is_active,
            questions: exam.questions.clone(),
        }
    }

    fn validate(&self) -> Result<ExamPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let title = errors.check("title", validation::required(&self.title));
        let duration = errors.check("duration", validation::int_in_range(&self.duration, 1, 600));
        let passing_score = errors.check(
            "passingScore",
            validation::int_in_range(&self.passing_score, 0, 100),
        );
        let max_attempts = errors.check(
            "maxAttempts",
            validation::int_in_range(&self.max_attempts, 1, 10),
        );

        if self.questions.is_empty() {
            errors.add("questions", "add at least one question");
        }
        for (index, question) in self.questions.iter().enumerate() {
            let number = index + 1;
            if question.content.trim().is_empty() {
                errors.add("questions", format!("question {number} has no content"));
            }
            if question.options.len() < 2 {
                errors.add("questions", format!("question {number} needs at least two options"));
            } else if question.correct_answer >= question.options.len() {
                errors.add("questions", format!("question {number} has no valid correct answer"));
            }
            if question.points == 0 {
                errors.add("questions", format!("question {number} must be worth at least 1 point"));
            }
        }

        match (title, duration, passing_score, max_attempts) {
            (Some(title), Some(duration), Some(passing_score), Some(max_attempts))
                if errors.is_empty() =>
            {
                Ok(ExamPayload {
                    title,
                    description: validation::optional(&self.description),
                    duration: duration as u32,
                    passing_score: passing_score as u32,
                    max_attempts: max_attempts as u32,
                    is_active: self.is_active,
                    questions: self.questions.clone(),
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(content: &str, correct: usize) -> ExamQuestion {
        ExamQuestion {
            id: None,
            content: content.to_string(),
            options: vec!["yes".to_string(), "no".to_string()],
            correct_answer: correct,
            points: 2,
        }
    }

    fn titled() -> ExamForm {
        ExamForm {
            title: "First aid basics".to_string(),
            ..ExamForm::default()
        }
    }

    #[test]
    fn exam_needs_questions() {
        let errors = titled().validate().unwrap_err();
        assert!(errors.has("questions"));

        let mut form = titled();
        form.add_question(question("Call 115 first?", 0));
        let payload = form.validate().unwrap();
        assert_eq!(payload.duration, 30);
        assert_eq!(payload.questions.len(), 1);
    }

    #[test]
    fn answer_out_of_range_is_rejected() {
        let mut form = titled();
        form.add_question(question("Broken", 5));
        assert!(form.validate().unwrap_err().has("questions"));
    }

    #[test]
    fn questions_reorder_and_remove() {
        let mut form = titled();
        for c in ["one", "two", "three"] {
            form.add_question(question(c, 0));
        }
        assert!(form.move_question(2, 0));
        assert!(!form.move_question(0, 3));
        let order: Vec<&str> = form.questions.iter().map(|q| q.content.as_str()).collect();
        assert_eq!(order, vec!["three", "one", "two"]);

        assert_eq!(form.remove_question(1).unwrap().content, "one");
        assert!(form.remove_question(7).is_none());
        assert_eq!(form.questions.len(), 2);
    }

    #[test]
    fn csv_import_reads_letters_and_optional_columns() {
        let data = "\
content,optionA,optionB,optionC,optionD,correctAnswer,points
Capital of Vietnam?,Hanoi,Hue,Da Nang,Saigon,a,3
Is water wet?,Yes,No,,,B,
";
        let mut form = titled();
        assert_eq!(form.import_csv(data.as_bytes()).unwrap(), 2);

        assert_eq!(form.questions[0].options.len(), 4);
        assert_eq!(form.questions[0].correct_answer, 0);
        assert_eq!(form.questions[0].points, 3);
        assert_eq!(form.questions[1].options, vec!["Yes", "No"]);
        assert_eq!(form.questions[1].correct_answer, 1);
        assert_eq!(form.questions[1].points, 1);
    }

    #[test]
    fn csv_import_is_all_or_nothing() {
        let data = "\
content,optionA,optionB,optionC,optionD,correctAnswer,points
Fine?,Yes,No,,,A,1
Bad answer,Yes,No,,,D,1
";
        let mut form = titled();
        let err = form.import_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(&err, AdminError::Csv(m) if m.starts_with("row 2")));
        assert!(form.questions.is_empty());
    }

    #[test]
    fn export_then_import_keeps_questions() {
        let mut form = titled();
        form.add_question(question("Helmet required?", 0));
        form.add_question(ExamQuestion {
            id: Some("q9".to_string()),
            content: "Pick the odd one".to_string(),
            options: vec!["2".into(), "4".into(), "7".into()],
            correct_answer: 2,
            points: 5,
        });

        let mut buffer = Vec::new();
        form.export_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("content,optionA,optionB,optionC,optionD,correctAnswer,points"));
        assert!(text.contains("Pick the odd one,2,4,7,,C,5"));

        let mut copy = titled();
        copy.import_csv(buffer.as_slice()).unwrap();
        assert_eq!(copy.questions[1].correct_answer, 2);
        assert_eq!(copy.questions[1].options.len(), 3);
    }
}
