//! Display-name rendering backed by the store.
//!
//! The template engine itself is pure (`entities::naming`); this module loads
//! the item type and the ancestor chain the template asks for, then renders.

use catalog_store::CatalogStore;
use entities::{naming, Item};

use crate::error::ServerResult;

/// Renders an item's display name from its type's template, loading as many
/// ancestors as the template walks. A type with no template renders to `""`.
pub async fn display_name<S: CatalogStore>(store: &S, item: &Item) -> ServerResult<String> {
    let template = match store
        .get_item_type(&item.user_token, &item.item_type_slug)
        .await?
    {
        Some(item_type) => item_type.name_schema,
        None => return Ok(String::new()),
    };
    render_with_chain(store, item, &template).await
}

/// Renders with a caller-supplied template, avoiding a type lookup when the
/// caller already holds it.
pub async fn render_with_chain<S: CatalogStore>(
    store: &S,
    item: &Item,
    template: &str,
) -> ServerResult<String> {
    let depth = naming::parent_depth(template);
    let mut chain: Vec<Item> = vec![item.clone()];
    while chain.len() <= depth {
        let parent_token = match chain.last().and_then(|i| i.parent_token.clone()) {
            Some(token) => token,
            None => break,
        };
        match store.get_item(&item.user_token, &parent_token).await? {
            Some(parent) => chain.push(parent),
            None => break,
        }
    }
    let refs: Vec<&Item> = chain.iter().collect();
    Ok(naming::render_name(template, &refs))
}
