use carta_api::PageQuery;
use carta_core::{CartaResult, ExitCode};
use serde_json::json;

use crate::{CatalogCommand, GlobalOptions, print_json, with_app_context};

pub(crate) fn cmd_catalog(command: CatalogCommand, globals: &GlobalOptions) -> CartaResult<ExitCode> {
    with_app_context(globals, |ctx| {
        match command {
            CatalogCommand::Banners { id } => {
                if let Some(id) = id {
                    let banner = ctx.api.banner_by_id(id)?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": banner}))?;
                    } else {
                        println!("{} | {}", banner.id, banner.title);
                        if let Some(link) = banner.link.as_deref() {
                            println!("link: {link}");
                        }
                    }
                } else {
                    let banners = ctx.api.banners()?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": banners}))?;
                    } else if banners.is_empty() {
                        println!("No banners.");
                    } else {
                        for banner in banners {
                            println!("{} | {}", banner.id, banner.title);
                        }
                    }
                }
            }
            CatalogCommand::Brochures { id } => {
                if let Some(id) = id {
                    let brochure = ctx.api.brochure_by_id(id)?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": brochure}))?;
                    } else {
                        println!("{} | {}", brochure.id, brochure.title);
                        if let Some(url) = brochure.pdf_url.as_deref() {
                            println!("pdf: {url}");
                        }
                        if let Some(until) = brochure.valid_to.as_deref() {
                            println!("valid until: {until}");
                        }
                    }
                } else {
                    let brochures = ctx.api.brochures()?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": brochures}))?;
                    } else if brochures.is_empty() {
                        println!("No brochures.");
                    } else {
                        for brochure in brochures {
                            println!("{} | {}", brochure.id, brochure.title);
                        }
                    }
                }
            }
            CatalogCommand::Shops { id } => {
                if let Some(id) = id {
                    let shop = ctx.api.shop_by_id(id)?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": shop}))?;
                    } else {
                        println!("{} | {}", shop.id, shop.name);
                        if let Some(address) = shop.address.as_deref() {
                            println!("address: {address}");
                        }
                        if let Some(city) = shop.city.as_deref() {
                            println!("city: {city}");
                        }
                        if let Some(phone) = shop.phone.as_deref() {
                            println!("phone: {phone}");
                        }
                    }
                } else {
                    let shops = ctx.api.shops()?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": shops}))?;
                    } else if shops.is_empty() {
                        println!("No shops.");
                    } else {
                        for shop in shops {
                            let city = shop.city.as_deref().unwrap_or("-");
                            println!("{} | {} ({})", shop.id, shop.name, city);
                        }
                    }
                }
            }
            CatalogCommand::Products {
                id,
                home,
                page,
                limit,
                category,
            } => {
                if let Some(id) = id {
                    let product = ctx.api.product_by_id(id)?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": product}))?;
                    } else {
                        println!("{} | {}", product.id, product.title);
                        if let Some(price) = product.price {
                            println!("price: {price:.2}");
                        }
                    }
                } else if home {
                    let products = ctx.api.home_products(limit, category.as_deref())?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": products}))?;
                    } else {
                        for product in products {
                            println!("{} | {}", product.id, product.title);
                        }
                    }
                } else {
                    let result = ctx.api.products(&PageQuery {
                        page,
                        limit,
                        category,
                    })?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": result}))?;
                    } else {
                        for product in &result.data {
                            println!("{} | {}", product.id, product.title);
                        }
                        println!(
                            "page {} ({} total)",
                            result.meta.page, result.meta.total
                        );
                    }
                }
            }
            CatalogCommand::Promocodes {
                id,
                page,
                limit,
                category,
            } => {
                if let Some(id) = id {
                    let code = ctx.api.promo_code_by_id(id)?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": code}))?;
                    } else {
                        println!("{} | {} | {}", code.id, code.code, code.title);
                        if let Some(description) = code.description.as_deref() {
                            println!("{description}");
                        }
                        if let Some(until) = code.valid_to.as_deref() {
                            println!("valid until: {until}");
                        }
                    }
                } else {
                    let result = ctx.api.promo_codes(&PageQuery {
                        page,
                        limit,
                        category,
                    })?;
                    if globals.json {
                        print_json(&json!({"ok": true, "result": result}))?;
                    } else {
                        for code in &result.data {
                            println!("{} | {} | {}", code.id, code.code, code.title);
                        }
                        println!(
                            "page {} ({} total)",
                            result.meta.page, result.meta.total
                        );
                    }
                }
            }
        }

        Ok(ExitCode::Success)
    })
}
