//! The four step transaction wizard.
//!
//! The wizard collects a [Draft] one step at a time and turns it into a
//! [NewTransaction] once the user confirms. Moving forward is guarded by
//! validation, moving back never loses what was entered.

use time::Date;

use crate::{
    auth::UserId,
    category::{Category, CategoryId},
    transaction::{NewTransaction, TransactionType},
};

/// The steps of the wizard, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WizardStep {
    #[default]
    DescriptionAndAmount,
    Type,
    CategoryAndDate,
    Confirm,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::DescriptionAndAmount,
        WizardStep::Type,
        WizardStep::CategoryAndDate,
        WizardStep::Confirm,
    ];

    /// The 1-based position of the step.
    pub fn number(self) -> u8 {
        match self {
            WizardStep::DescriptionAndAmount => 1,
            WizardStep::Type => 2,
            WizardStep::CategoryAndDate => 3,
            WizardStep::Confirm => 4,
        }
    }

    fn next(self) -> Self {
        match self {
            WizardStep::DescriptionAndAmount => WizardStep::Type,
            WizardStep::Type => WizardStep::CategoryAndDate,
            WizardStep::CategoryAndDate | WizardStep::Confirm => WizardStep::Confirm,
        }
    }

    fn previous(self) -> Self {
        match self {
            WizardStep::DescriptionAndAmount | WizardStep::Type => WizardStep::DescriptionAndAmount,
            WizardStep::CategoryAndDate => WizardStep::Type,
            WizardStep::Confirm => WizardStep::CategoryAndDate,
        }
    }
}

/// The transaction being built. Nothing here is persisted until submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub description: String,
    /// The amount as typed by the user.
    pub amount: String,
    pub transaction_type: TransactionType,
    pub category_id: Option<CategoryId>,
    pub date: Option<Date>,
}

impl Draft {
    fn new(today: Date) -> Self {
        Self {
            description: String::new(),
            amount: String::new(),
            transaction_type: TransactionType::Expense,
            category_id: None,
            date: Some(today),
        }
    }
}

/// Why the wizard refused to move on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error("Informe a descrição.")]
    MissingDescription,

    #[error("Informe o valor.")]
    MissingAmount,

    #[error("\"{0}\" não é um valor válido.")]
    InvalidAmount(String),

    #[error("Por favor, selecione uma categoria para continuar.")]
    MissingCategory,

    #[error("Informe a data.")]
    MissingDate,
}

impl WizardError {
    /// The step where the offending field is entered.
    pub fn step(&self) -> WizardStep {
        match self {
            WizardError::MissingDescription
            | WizardError::MissingAmount
            | WizardError::InvalidAmount(_) => WizardStep::DescriptionAndAmount,
            WizardError::MissingCategory | WizardError::MissingDate => {
                WizardStep::CategoryAndDate
            }
        }
    }
}

/// Parse an amount typed by the user, e.g. "150.75" or "150,75".
pub fn parse_amount(amount: &str) -> Result<f64, WizardError> {
    let amount = amount.trim();
    let normalized = if amount.contains('.') {
        amount.to_owned()
    } else {
        amount.replace(',', ".")
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| WizardError::InvalidAmount(amount.to_owned()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wizard {
    step: WizardStep,
    draft: Draft,
}

impl Wizard {
    /// A wizard on the first step with an empty draft dated `today`.
    pub fn new(today: Date) -> Self {
        Self {
            step: WizardStep::default(),
            draft: Draft::new(today),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn set_description(&mut self, description: &str) {
        self.draft.description = description.to_owned();
    }

    pub fn set_amount(&mut self, amount: &str) {
        self.draft.amount = amount.to_owned();
    }

    /// Change the transaction type.
    ///
    /// Categories belong to a type, so switching type drops the selected
    /// category.
    pub fn set_type(&mut self, transaction_type: TransactionType) {
        if self.draft.transaction_type != transaction_type {
            self.draft.transaction_type = transaction_type;
            self.draft.category_id = None;
        }
    }

    pub fn set_date(&mut self, date: Option<Date>) {
        self.draft.date = date;
    }

    /// Select `category_id` if it is one of `categories` with the draft's
    /// type, otherwise clear the selection.
    pub fn select_category(&mut self, category_id: Option<CategoryId>, categories: &[Category]) {
        self.draft.category_id = category_id.filter(|id| {
            categories.iter().any(|category| {
                category.id == *id && category.transaction_type == self.draft.transaction_type
            })
        });
    }

    /// Forget the selected category if it is `category_id`.
    pub fn clear_category(&mut self, category_id: CategoryId) {
        if self.draft.category_id == Some(category_id) {
            self.draft.category_id = None;
        }
    }

    /// Move to the next step if the fields of the current step are filled in.
    ///
    /// # Errors
    ///
    /// Returns the first missing field of the current step. The wizard stays
    /// where it is.
    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::DescriptionAndAmount => {
                if self.draft.description.trim().is_empty() {
                    return Err(WizardError::MissingDescription);
                }
                if self.draft.amount.trim().is_empty() {
                    return Err(WizardError::MissingAmount);
                }
            }
            WizardStep::Type => {}
            WizardStep::CategoryAndDate => {
                if self.draft.category_id.is_none() {
                    return Err(WizardError::MissingCategory);
                }
                if self.draft.date.is_none() {
                    return Err(WizardError::MissingDate);
                }
            }
            WizardStep::Confirm => {}
        }

        self.step = self.step.next();

        Ok(self.step)
    }

    /// Go back one step, keeping every field.
    pub fn back(&mut self) -> WizardStep {
        self.step = self.step.previous();

        self.step
    }

    /// Validate the whole draft and build the row to insert for `user_id`.
    ///
    /// # Errors
    ///
    /// On a validation failure the wizard moves to the step that owns the
    /// invalid field and the draft is left untouched.
    pub fn prepare_submission(&mut self, user_id: &UserId) -> Result<NewTransaction, WizardError> {
        self.validate(user_id).inspect_err(|error| self.step = error.step())
    }

    fn validate(&self, user_id: &UserId) -> Result<NewTransaction, WizardError> {
        let description = self.draft.description.trim();
        if description.is_empty() {
            return Err(WizardError::MissingDescription);
        }
        if self.draft.amount.trim().is_empty() {
            return Err(WizardError::MissingAmount);
        }
        let amount = parse_amount(&self.draft.amount)?;
        let category_id = self.draft.category_id.ok_or(WizardError::MissingCategory)?;
        let date = self.draft.date.ok_or(WizardError::MissingDate)?;

        Ok(NewTransaction {
            description: description.to_owned(),
            amount,
            transaction_type: self.draft.transaction_type,
            category_id,
            date,
            user_id: user_id.clone(),
        })
    }

    /// Start over with an empty draft dated `today`.
    pub fn reset(&mut self, today: Date) {
        *self = Self::new(today);
    }
}
