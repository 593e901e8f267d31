//! The state behind the transactions page.
//!
//! Loading `/transactions` mounts a [TransactionsPage]: the wizard, the
//! user's categories and their transactions. The wizard and category
//! endpoints work on that mount. A mount ends when the page is loaded again
//! or a different user (or nobody) is signed in. A token refresh for the same
//! user keeps it. Any backend result meant for an ended mount is dropped.

use std::sync::{Mutex, PoisonError};

use time::Date;
use tokio::sync::watch;

use crate::{
    auth::{SessionContext, SessionState, UserId},
    category::{Category, CategoryId, compare_by_name},
    transaction::{Transaction, Wizard},
};

/// Identifies one load of the transactions page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountId(u64);

impl MountId {
    /// The id of the first mount of a new slot.
    #[cfg(test)]
    pub(crate) fn first() -> Self {
        Self(1)
    }
}

impl std::fmt::Display for MountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A result arrived for a mount that has since been replaced or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transactions page mount {0} is no longer current")]
pub struct StaleMount(pub MountId);

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionsPage {
    pub mount_id: MountId,
    pub user_id: UserId,
    pub wizard: Wizard,
    /// Sorted by name.
    pub categories: Vec<Category>,
    /// Newest first.
    pub transactions: Vec<Transaction>,
}

impl TransactionsPage {
    pub fn new(
        mount_id: MountId,
        user_id: UserId,
        wizard: Wizard,
        mut categories: Vec<Category>,
        transactions: Vec<Transaction>,
    ) -> Self {
        categories.sort_by(compare_by_name);

        Self {
            mount_id,
            user_id,
            wizard,
            categories,
            transactions,
        }
    }

    /// The categories that can be chosen for the draft's type.
    pub fn categories_for_draft(&self) -> impl Iterator<Item = &Category> {
        let transaction_type = self.wizard.draft().transaction_type;

        self.categories
            .iter()
            .filter(move |category| category.transaction_type == transaction_type)
    }

    /// Add a newly created category and select it in the wizard.
    pub fn add_category(&mut self, category: Category) {
        let position = self
            .categories
            .partition_point(|existing| compare_by_name(existing, &category).is_le());
        let category_id = category.id;
        self.categories.insert(position, category);
        self.wizard
            .select_category(Some(category_id), &self.categories);
    }

    /// Remove the category with `category_id`, deselecting it in the wizard.
    pub fn remove_category(&mut self, category_id: CategoryId) {
        self.categories.retain(|category| category.id != category_id);
        self.wizard.clear_category(category_id);
    }

    /// Show a newly inserted transaction first and start a new draft.
    pub fn record_transaction(&mut self, transaction: Transaction, today: Date) {
        self.transactions.insert(0, transaction);
        self.wizard.reset(today);
    }
}

/// Holds the current mount of the transactions page.
pub struct TransactionsPageSlot {
    inner: Mutex<SlotState>,
}

struct SlotState {
    latest: u64,
    mounted: Option<TransactionsPage>,
    session_changes: watch::Receiver<SessionState>,
    /// The user the session context last reported as signed in.
    user: Option<UserId>,
}

impl SlotState {
    /// Drop the mount if the signed-in user changed since it was made.
    fn check_session(&mut self) {
        // A closed channel means the session can no longer change.
        if !self.session_changes.has_changed().unwrap_or(false) {
            return;
        }

        let user = signed_in_user(&self.session_changes.borrow_and_update());
        if user == self.user {
            return;
        }

        self.user = user;
        if let Some(page) = self.mounted.take() {
            tracing::debug!(
                "Signed-in user changed, dropping transactions page mount {}",
                page.mount_id
            );
        }
        // Mounts that started before the change must not complete.
        self.latest += 1;
    }
}

fn signed_in_user(state: &SessionState) -> Option<UserId> {
    match state {
        SessionState::Resolved(Some(session)) => Some(session.user_id().clone()),
        SessionState::Resolved(None) | SessionState::Resolving => None,
    }
}

impl TransactionsPageSlot {
    pub fn new(session: &SessionContext) -> Self {
        let mut session_changes = session.subscribe();
        let user = signed_in_user(&session_changes.borrow_and_update());

        Self {
            inner: Mutex::new(SlotState {
                latest: 0,
                mounted: None,
                session_changes,
                user,
            }),
        }
    }

    /// Start a new mount. The current mount, and any mount still loading,
    /// can no longer be completed or updated.
    pub fn begin_mount(&self) -> MountId {
        let mut state = self.lock();
        state.check_session();
        state.latest += 1;

        MountId(state.latest)
    }

    /// Install `page` if its mount is still the latest one.
    ///
    /// # Errors
    ///
    /// Returns [StaleMount] if another mount started since, or the session
    /// changed.
    pub fn finish_mount(&self, page: TransactionsPage) -> Result<(), StaleMount> {
        let mut state = self.lock();
        state.check_session();

        if page.mount_id != MountId(state.latest) {
            tracing::info!(
                "Discarding data loaded for transactions page mount {}",
                page.mount_id
            );
            return Err(StaleMount(page.mount_id));
        }

        state.mounted = Some(page);

        Ok(())
    }

    /// Run `f` on the mounted page, if there is one.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut TransactionsPage) -> R) -> Option<R> {
        let mut state = self.lock();
        state.check_session();

        state.mounted.as_mut().map(f)
    }

    /// Run `f` on the page if `mount_id` is still mounted.
    ///
    /// # Errors
    ///
    /// Returns [StaleMount], and does not call `f`, if the mount was replaced
    /// or dropped.
    pub fn update<R>(
        &self,
        mount_id: MountId,
        f: impl FnOnce(&mut TransactionsPage) -> R,
    ) -> Result<R, StaleMount> {
        let mut state = self.lock();
        state.check_session();

        match state.mounted.as_mut() {
            Some(page) if page.mount_id == mount_id => Ok(f(page)),
            _ => {
                tracing::info!("Discarding a result for transactions page mount {mount_id}");
                Err(StaleMount(mount_id))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod transactions_page_tests {
    use time::macros::date;

    use crate::{
        auth::{SessionContext, UserId},
        backend::test_session,
        category::{Category, CategoryName},
        transaction::{Transaction, TransactionType, Wizard, WizardStep},
    };

    use super::{MountId, StaleMount, TransactionsPage, TransactionsPageSlot};

    const TODAY: time::Date = date!(2024 - 03 - 15);

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: CategoryName::new_unchecked(name),
            transaction_type: TransactionType::Expense,
            user_id: UserId::new("user-1"),
        }
    }

    fn page(mount_id: MountId) -> TransactionsPage {
        TransactionsPage::new(
            mount_id,
            UserId::new("user-1"),
            Wizard::new(TODAY),
            vec![category(2, "Mercado"), category(1, "aluguel")],
            Vec::new(),
        )
    }

    fn names(page: &TransactionsPage) -> Vec<String> {
        page.categories
            .iter()
            .map(|category| category.name.to_string())
            .collect()
    }

    #[test]
    fn categories_are_sorted_on_mount() {
        assert_eq!(names(&page(MountId(1))), vec!["aluguel", "Mercado"]);
    }

    #[test]
    fn added_category_is_sorted_in_and_selected() {
        let mut page = page(MountId(1));

        page.add_category(category(7, "Lazer"));

        assert_eq!(names(&page), vec!["aluguel", "Lazer", "Mercado"]);
        assert_eq!(
            page.categories
                .iter()
                .filter(|category| category.name.to_string() == "Lazer")
                .count(),
            1
        );
        assert_eq!(page.wizard.draft().category_id, Some(7));
    }

    #[test]
    fn removing_category_removes_only_that_one() {
        let mut page = page(MountId(1));
        page.wizard.select_category(Some(2), &page.categories.clone());

        page.remove_category(2);

        assert_eq!(names(&page), vec!["aluguel"]);
        assert_eq!(page.wizard.draft().category_id, None);
    }

    #[test]
    fn recorded_transaction_comes_first_and_wizard_resets() {
        let mut page = page(MountId(1));
        page.wizard.set_description("Mercado");
        page.wizard.set_amount("150.75");
        page.wizard.next().unwrap();
        let transaction = Transaction {
            id: 42,
            description: "Mercado".to_owned(),
            amount: 150.75,
            transaction_type: TransactionType::Expense,
            date: date!(2024 - 03 - 10),
            category_id: Some(7),
            user_id: UserId::new("user-1"),
            category_name: Some("Lazer".to_owned()),
        };

        page.record_transaction(transaction, TODAY);

        assert_eq!(page.transactions[0].description, "Mercado");
        assert_eq!(page.wizard, Wizard::new(TODAY));
        assert_eq!(page.wizard.step(), WizardStep::DescriptionAndAmount);
    }

    #[test]
    fn older_mount_cannot_finish() {
        let context = SessionContext::resolved(Some(test_session()));
        let slot = TransactionsPageSlot::new(&context);

        let first = slot.begin_mount();
        let second = slot.begin_mount();

        assert_eq!(slot.finish_mount(page(first)), Err(StaleMount(first)));
        assert_eq!(slot.finish_mount(page(second)), Ok(()));
        assert_eq!(
            slot.with_current(|page| page.mount_id),
            Some(second)
        );
    }

    #[test]
    fn update_for_replaced_mount_is_discarded() {
        let context = SessionContext::resolved(Some(test_session()));
        let slot = TransactionsPageSlot::new(&context);
        let first = slot.begin_mount();
        slot.finish_mount(page(first)).unwrap();

        let second = slot.begin_mount();
        slot.finish_mount(page(second)).unwrap();

        let result = slot.update(first, |page| page.remove_category(1));
        assert_eq!(result, Err(StaleMount(first)));
        assert_eq!(slot.with_current(|page| page.categories.len()), Some(2));
    }

    #[tokio::test]
    async fn session_change_drops_the_mount() {
        let backend = std::sync::Arc::new(
            crate::backend::FakeBackend::new().with_session(test_session()),
        );
        let (context, _subscription) = SessionContext::mount(backend.clone());
        let mut changes = context.subscribe();
        changes
            .wait_for(|state| *state != crate::auth::SessionState::Resolving)
            .await
            .unwrap();
        let slot = TransactionsPageSlot::new(&context);
        let mount_id = slot.begin_mount();
        slot.finish_mount(page(mount_id)).unwrap();

        backend.emit(crate::backend::AuthEvent::SignedOut);
        changes.changed().await.unwrap();

        assert_eq!(slot.with_current(|page| page.mount_id), None);
        assert_eq!(
            slot.update(mount_id, |_| ()),
            Err(StaleMount(mount_id))
        );
    }

    #[tokio::test]
    async fn mount_started_before_session_change_cannot_finish() {
        let backend = std::sync::Arc::new(
            crate::backend::FakeBackend::new().with_session(test_session()),
        );
        let (context, _subscription) = SessionContext::mount(backend.clone());
        let mut changes = context.subscribe();
        changes
            .wait_for(|state| *state != crate::auth::SessionState::Resolving)
            .await
            .unwrap();
        let slot = TransactionsPageSlot::new(&context);
        let mount_id = slot.begin_mount();

        backend.emit(crate::backend::AuthEvent::SignedOut);
        changes.changed().await.unwrap();

        assert_eq!(slot.finish_mount(page(mount_id)), Err(StaleMount(mount_id)));
    }

    #[tokio::test]
    async fn same_user_token_refresh_keeps_the_draft() {
        let backend = std::sync::Arc::new(
            crate::backend::FakeBackend::new().with_session(test_session()),
        );
        let (context, _subscription) = SessionContext::mount(backend.clone());
        let mut changes = context.subscribe();
        changes
            .wait_for(|state| *state != crate::auth::SessionState::Resolving)
            .await
            .unwrap();
        let slot = TransactionsPageSlot::new(&context);
        let mount_id = slot.begin_mount();
        slot.finish_mount(page(mount_id)).unwrap();
        slot.update(mount_id, |page| page.wizard.set_description("Mercado"))
            .unwrap();

        let mut refreshed = test_session();
        refreshed.access_token = "refreshed-access-token".to_owned();
        backend.emit(crate::backend::AuthEvent::TokenRefreshed(refreshed));
        changes.changed().await.unwrap();

        assert_eq!(
            slot.with_current(|page| page.wizard.draft().description.clone()),
            Some("Mercado".to_owned())
        );
        assert_eq!(slot.update(mount_id, |page| page.mount_id), Ok(mount_id));
    }

    #[test]
    fn mount_outlives_a_dropped_session_context() {
        let context = SessionContext::resolved(Some(test_session()));
        let slot = TransactionsPageSlot::new(&context);
        let mount_id = slot.begin_mount();
        slot.finish_mount(page(mount_id)).unwrap();

        drop(context);

        assert_eq!(slot.with_current(|page| page.mount_id), Some(mount_id));
    }
}
