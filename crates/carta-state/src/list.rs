use carta_api::{ItemId, ShoppingItem, StorefrontApi};
use carta_core::{CartaError, CartaResult};
use carta_store::{Session, ShoppingListStore};
use chrono::Utc;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    Remote,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListStatus {
    pub mode: ListMode,
    pub fell_back: bool,
}

/// Shopping list with two backing modes: server-backed (`Remote`) and
/// storage-backed (`Local`). The first 401/403 from any operation demotes
/// the list to local mode; only a `load()` with a token present goes back.
#[derive(Debug)]
pub struct ShoppingList {
    api: StorefrontApi,
    store: ShoppingListStore,
    items: Vec<ShoppingItem>,
    mode: ListMode,
}

impl ShoppingList {
    pub fn new(api: StorefrontApi, store: ShoppingListStore, session: &Session) -> Self {
        let mode = if session.token().is_some() {
            ListMode::Remote
        } else {
            ListMode::Local
        };

        Self {
            api,
            store,
            items: Vec::new(),
            mode,
        }
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    pub fn sorted(&self) -> Vec<ShoppingItem> {
        sorted_for_display(&self.items)
    }

    pub fn load(&mut self, session: &Session) -> CartaResult<ListStatus> {
        // The mode is re-evaluated from scratch: a present token always
        // retries the server, which is the only way back to remote mode.
        let Some(token) = session.token() else {
            self.items = self.store.read_list();
            self.mode = ListMode::Local;
            return Ok(self.status(false));
        };

        match self.api.shopping_list(Some(token)) {
            Ok(items) => {
                self.items = items;
                self.mode = ListMode::Remote;
                Ok(self.status(false))
            }
            Err(err) if err.is_unauthorized() => {
                self.items = self.store.read_list();
                self.mode = ListMode::Local;
                tracing::warn!("authorization failed; shopping list switched to local mode");
                Ok(self.status(true))
            }
            Err(err) => {
                tracing::debug!(error = %err, "shopping list load failed");
                Err(CartaError::api("failed to load the shopping list"))
            }
        }
    }

    pub fn create(&mut self, session: &Session, title: &str) -> CartaResult<ListStatus> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CartaError::usage("title must not be empty"));
        }

        if self.is_local(session) {
            self.items.insert(0, make_local_item(title));
            self.store.write_list(&self.items)?;
            return Ok(self.status(false));
        }

        match self.api.create_item(session.token(), title) {
            Ok(Some(item)) => {
                self.items.insert(0, item);
                Ok(self.status(false))
            }
            // No id echoed back; resynchronize.
            Ok(None) => self.load(session),
            Err(err) if err.is_unauthorized() => {
                self.items.insert(0, make_local_item(title));
                self.demote_keeping_items()
            }
            Err(err) => {
                tracing::debug!(error = %err, "shopping list create failed");
                Err(CartaError::api("failed to add the shopping list item"))
            }
        }
    }

    pub fn toggle_done(&mut self, session: &Session, id: &ItemId) -> CartaResult<ListStatus> {
        let index = self.index_of(id)?;
        let next = if self.items[index].is_done == 0 { 1 } else { 0 };

        self.reconcile(
            session,
            |items| items[index].is_done = next,
            |api, token| api.toggle_item(token, id, next),
            "failed to update the shopping list item",
        )
    }

    pub fn update_title(
        &mut self,
        session: &Session,
        id: &ItemId,
        title: &str,
    ) -> CartaResult<ListStatus> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CartaError::usage("title must not be empty"));
        }

        let index = self.index_of(id)?;
        let new_title = title.to_string();

        self.reconcile(
            session,
            move |items| items[index].title = new_title,
            |api, token| api.update_item(token, id, title),
            "failed to update the shopping list item",
        )
    }

    pub fn remove(&mut self, session: &Session, id: &ItemId) -> CartaResult<ListStatus> {
        let index = self.index_of(id)?;

        self.reconcile(
            session,
            move |items| {
                items.remove(index);
            },
            |api, token| api.delete_item(token, id),
            "failed to remove the shopping list item",
        )
    }

    // Shared optimistic path: auth failure keeps the applied value and
    // demotes; any other failure restores the snapshot.
    fn reconcile<A, C>(
        &mut self,
        session: &Session,
        apply: A,
        commit: C,
        failure: &'static str,
    ) -> CartaResult<ListStatus>
    where
        A: FnOnce(&mut Vec<ShoppingItem>),
        C: FnOnce(&StorefrontApi, Option<&str>) -> CartaResult<()>,
    {
        if self.is_local(session) {
            apply(&mut self.items);
            self.store.write_list(&self.items)?;
            return Ok(self.status(false));
        }

        let snapshot = self.items.clone();
        apply(&mut self.items);

        match commit(&self.api, session.token()) {
            Ok(()) => Ok(self.status(false)),
            Err(err) if err.is_unauthorized() => self.demote_keeping_items(),
            Err(err) => {
                self.items = snapshot;
                tracing::debug!(error = %err, "shopping list mutation failed");
                Err(CartaError::api(failure))
            }
        }
    }

    fn demote_keeping_items(&mut self) -> CartaResult<ListStatus> {
        self.mode = ListMode::Local;
        self.store.write_list(&self.items)?;
        tracing::warn!("authorization failed; shopping list switched to local mode");
        Ok(self.status(true))
    }

    fn index_of(&self, id: &ItemId) -> CartaResult<usize> {
        self.items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| CartaError::usage(format!("no shopping list item with id '{id}'")))
    }

    fn is_local(&self, session: &Session) -> bool {
        self.mode == ListMode::Local || session.token().is_none()
    }

    fn status(&self, fell_back: bool) -> ListStatus {
        ListStatus {
            mode: self.mode,
            fell_back,
        }
    }
}

pub fn sorted_for_display(items: &[ShoppingItem]) -> Vec<ShoppingItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| {
        a.is_done
            .cmp(&b.is_done)
            .then_with(|| a.sort_order.cmp(&b.sort_order))
            .then_with(|| b.created_at_ts.cmp(&a.created_at_ts))
            .then_with(|| b.id.numeric().cmp(&a.id.numeric()))
    });
    sorted
}

pub fn make_local_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..100_000);
    format!("local_{}_{}", Utc::now().timestamp_millis(), suffix)
}

fn make_local_item(title: &str) -> ShoppingItem {
    ShoppingItem {
        id: ItemId::Local(make_local_id()),
        title: title.to_string(),
        is_done: 0,
        sort_order: 0,
        created_at_ts: Utc::now().timestamp_millis(),
    }
}
