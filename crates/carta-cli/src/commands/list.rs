use carta_api::ItemId;
use carta_core::{CartaError, CartaResult, ExitCode};
use carta_state::{ListMode, ListStatus, ShoppingList};
use carta_store::{SessionStore, ShoppingListStore};
use serde_json::json;

use crate::{GlobalOptions, ListCommand, print_json, with_app_context};

pub(crate) fn cmd_list(command: ListCommand, globals: &GlobalOptions) -> CartaResult<ExitCode> {
    // The confirmation gate comes before any network traffic.
    if let ListCommand::Rm { .. } = &command
        && !globals.yes
    {
        return Err(CartaError::usage(
            "removing a shopping list item is destructive; rerun with --yes",
        ));
    }

    with_app_context(globals, |ctx| {
        let session = SessionStore::new(ctx.kv.clone()).load()?.unwrap_or_default();
        let store = ShoppingListStore::new(ctx.kv.clone());
        let mut list = ShoppingList::new(ctx.api.clone(), store, &session);

        let status = list.load(&session)?;
        notify_fallback(&status);

        match command {
            ListCommand::Show => {
                render_list(&list, globals)?;
                Ok(ExitCode::Success)
            }
            ListCommand::Add { title } => {
                let status = list.create(&session, &title)?;
                notify_fallback(&status);

                if globals.json {
                    print_json(&json!({
                        "ok": true,
                        "result": { "mode": status.mode, "items": list.sorted() }
                    }))?;
                } else {
                    println!("Added '{}'.", title.trim());
                    note_local_mode(status.mode);
                }

                Ok(ExitCode::Success)
            }
            ListCommand::Done { id } => {
                let id = ItemId::parse(&id);
                let status = list.toggle_done(&session, &id)?;
                notify_fallback(&status);

                let item = list.items().iter().find(|item| item.id == id);
                if globals.json {
                    print_json(&json!({
                        "ok": true,
                        "result": { "mode": status.mode, "item": item }
                    }))?;
                } else if let Some(item) = item {
                    let state = if item.is_done == 1 { "done" } else { "not done" };
                    println!("'{}' marked {}.", item.title, state);
                }

                Ok(ExitCode::Success)
            }
            ListCommand::Edit { id, title } => {
                let id = ItemId::parse(&id);
                let status = list.update_title(&session, &id, &title)?;
                notify_fallback(&status);

                if globals.json {
                    let item = list.items().iter().find(|item| item.id == id);
                    print_json(&json!({
                        "ok": true,
                        "result": { "mode": status.mode, "item": item }
                    }))?;
                } else {
                    println!("Renamed item {} to '{}'.", id, title.trim());
                }

                Ok(ExitCode::Success)
            }
            ListCommand::Rm { id } => {
                let id = ItemId::parse(&id);
                let status = list.remove(&session, &id)?;
                notify_fallback(&status);

                if globals.json {
                    print_json(&json!({
                        "ok": true,
                        "result": { "mode": status.mode, "items": list.sorted() }
                    }))?;
                } else {
                    println!("Removed item {id}.");
                }

                Ok(ExitCode::Success)
            }
        }
    })
}

fn render_list(list: &ShoppingList, globals: &GlobalOptions) -> CartaResult<()> {
    let sorted = list.sorted();

    if globals.json {
        return print_json(&json!({
            "ok": true,
            "result": { "mode": list.mode(), "items": sorted }
        }));
    }

    if sorted.is_empty() {
        println!("The shopping list is empty.");
    } else {
        for item in &sorted {
            let mark = if item.is_done == 1 { "x" } else { " " };
            println!("[{}] {}  {}", mark, item.id, item.title);
        }
    }
    note_local_mode(list.mode());

    Ok(())
}

fn note_local_mode(mode: ListMode) {
    if mode == ListMode::Local {
        println!("The list is stored locally on this device; sign in to sync it.");
    }
}

fn notify_fallback(status: &ListStatus) {
    if status.fell_back {
        eprintln!("notice: authorization failed; the shopping list switched to local mode");
    }
}
