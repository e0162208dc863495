use carta_api::VirtualCardRequest;
use carta_core::{CartaError, CartaResult, ExitCode};
use carta_state::{CardManager, ScanOutcome};
use carta_store::{Session, SessionStore};
use serde_json::json;

use crate::{AppContext, CardCommand, GlobalOptions, VirtualCommand, print_json, with_app_context};

pub(crate) fn cmd_card(command: CardCommand, globals: &GlobalOptions) -> CartaResult<ExitCode> {
    with_app_context(globals, |ctx| {
        let session = load_session(&ctx)?;
        let mut cards = CardManager::new(ctx.api.clone());

        match command {
            CardCommand::Show => {
                if !session.is_authenticated() {
                    if globals.json {
                        print_json(&json!({
                            "ok": false,
                            "result": { "authenticated": false, "card": null }
                        }))?;
                    } else {
                        println!("Not signed in; run `carta auth login` first.");
                    }
                    return Ok(ExitCode::Auth);
                }

                cards.load(&session)?;

                if globals.json {
                    print_json(&json!({
                        "ok": true,
                        "result": {
                            "card": cards.card(),
                            "virtual_available": cards.virtual_available(),
                            "virtual_ccnum": cards.virtual_ccnum(),
                        }
                    }))?;
                } else {
                    match cards.card() {
                        Some(card) => println!("Card: {}", card.ccnum),
                        None => println!("No client card set."),
                    }
                    if cards.virtual_available() {
                        match cards.virtual_ccnum() {
                            Some(ccnum) => println!("Virtual card available: {ccnum}"),
                            None => println!("Virtual card available."),
                        }
                    }
                }

                Ok(ExitCode::Success)
            }
            CardCommand::Set { ccnum } => {
                cards.save_card(&session, &ccnum)?;
                render_saved(&cards, globals)?;
                Ok(ExitCode::Success)
            }
            CardCommand::Scan { code } => {
                match cards.handle_scan(&session, &code)? {
                    ScanOutcome::Saved => {
                        render_saved(&cards, globals)?;
                    }
                    ScanOutcome::Ignored => {
                        if globals.json {
                            print_json(&json!({"ok": true, "result": {"scan": "ignored"}}))?;
                        } else {
                            println!("Scan ignored: a save is already in progress.");
                        }
                    }
                }

                Ok(ExitCode::Success)
            }
            CardCommand::Remove => {
                if !globals.yes {
                    return Err(CartaError::usage(
                        "removing the client card is destructive; rerun with --yes",
                    ));
                }

                cards.remove_card(&session)?;

                if globals.json {
                    print_json(&json!({"ok": true, "result": {"card": null}}))?;
                } else {
                    println!("Client card removed.");
                }

                Ok(ExitCode::Success)
            }
            CardCommand::Virtual { command } => cmd_virtual(command, globals, &session, &mut cards),
        }
    })
}

fn cmd_virtual(
    command: VirtualCommand,
    globals: &GlobalOptions,
    session: &Session,
    cards: &mut CardManager,
) -> CartaResult<ExitCode> {
    match command {
        VirtualCommand::Attach => {
            let Some(ccnum) = cards.existing_virtual(session) else {
                return Err(CartaError::usage(
                    "no issued virtual card to attach; use `carta card virtual create`",
                ));
            };

            cards.save_card(session, &ccnum)?;
            render_saved(cards, globals)?;
            Ok(ExitCode::Success)
        }
        VirtualCommand::Create {
            first_name,
            middle_name,
            last_name,
            egn,
            post_code,
            phone,
            email,
            wants_games,
            city,
            street_or_district,
            street_no,
            block,
            entrance,
            apartment,
            consent,
        } => {
            let form = VirtualCardRequest {
                first_name,
                middle_name,
                last_name,
                egn,
                post_code,
                phone,
                email,
                wants_games,
                city,
                street_or_district,
                street_no,
                block,
                entrance,
                apartment,
                consent,
            };

            let issued = cards.create_virtual(session, &form)?;

            if globals.json {
                print_json(&json!({
                    "ok": true,
                    "result": { "issued_ccnum": issued, "card": cards.card() }
                }))?;
            } else {
                match issued {
                    Some(ccnum) => println!("Virtual card created and attached: {ccnum}"),
                    None => println!(
                        "Virtual card application accepted; the number will appear after processing."
                    ),
                }
            }

            Ok(ExitCode::Success)
        }
    }
}

fn render_saved(cards: &CardManager, globals: &GlobalOptions) -> CartaResult<()> {
    if globals.json {
        print_json(&json!({
            "ok": true,
            "result": {
                "card": cards.card(),
                "virtual_available": cards.virtual_available(),
                "virtual_ccnum": cards.virtual_ccnum(),
            }
        }))
    } else {
        match cards.card() {
            Some(card) => println!("Card saved: {}", card.ccnum),
            None => println!("Card saved."),
        }
        Ok(())
    }
}

fn load_session(ctx: &AppContext) -> CartaResult<Session> {
    Ok(SessionStore::new(ctx.kv.clone()).load()?.unwrap_or_default())
}
