// Shape and range checks shared by the gateway and the core server.
//
// Every body and query struct deserializes with optional fields so that a
// missing field is reported as InvalidData with a readable message rather
// than as a serde rejection.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::booking::{NewBooking, State};
use crate::error::{AppError, AppResult};
use crate::ids::{ItemId, RequestId};
use crate::item::{ItemPatch, NewItem};
use crate::pagination::{Page, DEFAULT_FROM, DEFAULT_SIZE};
use crate::request::NewRequest;
use crate::user::{NewUser, UserPatch};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 500;

fn invalid(message: impl Into<String>) -> AppError {
    AppError::InvalidData(message.into())
}

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| invalid(format!("Field {} is required", field)))
}

fn non_blank(value: &str, field: &str, max: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("Field {} must not be blank", field)));
    }
    if value.chars().count() > max {
        return Err(invalid(format!(
            "Field {} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn positive_id(value: i64, field: &str) -> AppResult<u64> {
    if value < 1 {
        return Err(invalid(format!("Field {} must be positive, got {}", field, value)));
    }
    Ok(value as u64)
}

/// `local@domain.tld`: one `@`, no whitespace, a dotted domain without empty labels.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn check_email(email: &str) -> AppResult<()> {
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(invalid(format!(
            "Field email must be at most {} characters",
            MAX_EMAIL_LEN
        )));
    }
    if !is_valid_email(email) {
        return Err(invalid(format!("Invalid email: {}", email)));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserBody {
    pub fn validate(self) -> AppResult<NewUser> {
        let name = required(self.name, "name")?;
        non_blank(&name, "name", MAX_NAME_LEN)?;
        let email = required(self.email, "email")?;
        check_email(&email)?;
        Ok(NewUser { name, email })
    }

    pub fn validate_patch(self) -> AppResult<UserPatch> {
        if let Some(name) = &self.name {
            non_blank(name, "name", MAX_NAME_LEN)?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        Ok(UserPatch {
            name: self.name,
            email: self.email,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
}

impl ItemBody {
    pub fn validate(self) -> AppResult<NewItem> {
        let name = required(self.name, "name")?;
        non_blank(&name, "name", MAX_NAME_LEN)?;
        let description = required(self.description, "description")?;
        non_blank(&description, "description", MAX_DESCRIPTION_LEN)?;
        let available = required(self.available, "available")?;
        let request_id = self
            .request_id
            .map(|id| positive_id(id, "requestId").map(RequestId))
            .transpose()?;
        Ok(NewItem {
            name,
            description,
            available,
            request_id,
        })
    }

    /// `requestId` is fixed at creation and ignored here.
    pub fn validate_patch(self) -> AppResult<ItemPatch> {
        if let Some(name) = &self.name {
            non_blank(name, "name", MAX_NAME_LEN)?;
        }
        if let Some(description) = &self.description {
            non_blank(description, "description", MAX_DESCRIPTION_LEN)?;
        }
        Ok(ItemPatch {
            name: self.name,
            description: self.description,
            available: self.available,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDateTime>,
}

impl BookingBody {
    /// Interval ordering is left to the booking engine.
    pub fn validate(self) -> AppResult<NewBooking> {
        let item_id = positive_id(required(self.item_id, "itemId")?, "itemId")?;
        Ok(NewBooking {
            item_id: ItemId(item_id),
            start: required(self.start, "start")?,
            end: required(self.end, "end")?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CommentBody {
    pub fn validate(self) -> AppResult<String> {
        let text = required(self.text, "text")?;
        if text.trim().is_empty() {
            return Err(invalid("Field text must not be blank"));
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RequestBody {
    pub fn validate(self) -> AppResult<NewRequest> {
        let description = required(self.description, "description")?;
        non_blank(&description, "description", MAX_DESCRIPTION_LEN)?;
        Ok(NewRequest { description })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub from: Option<i64>,
    pub size: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> AppResult<Page> {
        Page::new(
            self.from.unwrap_or(DEFAULT_FROM),
            self.size.unwrap_or(DEFAULT_SIZE),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateParams {
    pub state: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

impl StateParams {
    pub fn page(&self) -> AppResult<Page> {
        PageParams {
            from: self.from,
            size: self.size,
        }
        .page()
    }

    /// Raw state text, `ALL` when absent.
    pub fn state_text(&self) -> &str {
        self.state.as_deref().unwrap_or("ALL")
    }

    /// Rejects an unrecognised state up front.
    pub fn check_state(&self) -> AppResult<State> {
        Ok(State::parse(self.state_text())?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub text: Option<String>,
    pub from: Option<i64>,
    pub size: Option<i64>,
}

impl SearchParams {
    pub fn page(&self) -> AppResult<Page> {
        PageParams {
            from: self.from,
            size: self.size,
        }
        .page()
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalParams {
    pub approved: Option<String>,
}

impl ApprovalParams {
    /// Presence only; the value itself is judged by the booking engine.
    pub fn approved(&self) -> AppResult<&str> {
        self.approved
            .as_deref()
            .ok_or_else(|| invalid("Parameter approved is required"))
    }
}
