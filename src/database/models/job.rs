use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::database::patch::{double_option, lenient_int, present_json, Assignments, Patch};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Job {
    pub id: i32,
    pub company_id: i32,
    pub title: String,
    pub department: Option<String>,
    pub location: String,
    pub employment_type: String,
    pub experience_level: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub description: String,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub skills: Option<Value>,
    pub is_remote: bool,
    pub is_urgent: bool,
    pub status: String,
    pub applicants_count: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Active,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Active => "active",
            JobStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "active" => Ok(JobStatus::Active),
            "closed" => Ok(JobStatus::Closed),
            _ => Err("Invalid status. Valid statuses are: pending, active, closed".to_string()),
        }
    }
}

/// Posting payload as sent by the job form (camelCase aliases accepted).
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "employmentType")]
    pub employment_type: String,
    #[serde(default, alias = "experience")]
    pub experience_level: Option<String>,
    #[serde(default, alias = "salaryMin", deserialize_with = "lenient_int")]
    pub salary_min: Option<Option<i32>>,
    #[serde(default, alias = "salaryMax", deserialize_with = "lenient_int")]
    pub salary_max: Option<Option<i32>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub responsibilities: Option<String>,
    #[serde(default)]
    pub skills: Option<Value>,
    #[serde(default, alias = "remote")]
    pub is_remote: Option<bool>,
    #[serde(default, alias = "urgent")]
    pub is_urgent: Option<bool>,
}

impl NewJob {
    /// Field-level validation errors; empty when the posting is acceptable.
    pub fn validate(&self) -> HashMap<String, String> {
        let mut errors = HashMap::new();
        for (field, value) in [
            ("title", &self.title),
            ("location", &self.location),
            ("employment_type", &self.employment_type),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                errors.insert(field.to_string(), "This field is required".to_string());
            }
        }

        if let (Some(Some(min)), Some(Some(max))) = (self.salary_min, self.salary_max) {
            if min > max {
                errors.insert(
                    "salary_max".to_string(),
                    "Maximum salary must not be below minimum salary".to_string(),
                );
            }
        }

        errors
    }

    pub fn salary_min(&self) -> Option<i32> {
        self.salary_min.flatten()
    }

    pub fn salary_max(&self) -> Option<i32> {
        self.salary_max.flatten()
    }
}

/// Client-writable job columns. `applicants_count` is absent:
/// it only ever moves through the apply increment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub department: Option<Option<String>>,
    pub location: Option<String>,
    #[serde(alias = "employmentType")]
    pub employment_type: Option<String>,
    #[serde(default, alias = "experience", deserialize_with = "double_option")]
    pub experience_level: Option<Option<String>>,
    #[serde(default, alias = "salaryMin", deserialize_with = "lenient_int")]
    pub salary_min: Option<Option<i32>>,
    #[serde(default, alias = "salaryMax", deserialize_with = "lenient_int")]
    pub salary_max: Option<Option<i32>>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub requirements: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub responsibilities: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_json")]
    pub skills: Option<Value>,
    #[serde(alias = "remote")]
    pub is_remote: Option<bool>,
    #[serde(alias = "urgent")]
    pub is_urgent: Option<bool>,
    pub status: Option<JobStatus>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl Patch for JobPatch {
    const TABLE: &'static str = "jobs";

    fn write(self, out: &mut Assignments) {
        out.required("title", self.title)
            .nullable("department", self.department)
            .required("location", self.location)
            .required("employment_type", self.employment_type)
            .nullable("experience_level", self.experience_level)
            .nullable("salary_min", self.salary_min)
            .nullable("salary_max", self.salary_max)
            .required("description", self.description)
            .nullable("requirements", self.requirements)
            .nullable("responsibilities", self.responsibilities)
            .json("skills", self.skills)
            .required("is_remote", self.is_remote)
            .required("is_urgent", self.is_urgent)
            .required("status", self.status.map(|s| s.as_str().to_string()));
    }
}
