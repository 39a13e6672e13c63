use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::models::{LabelKind, LabelRequest, NewRecipe, RecipeChanges, RecipeRequest};
use crate::query::{self, RecipeFilter};
use crate::AppState;

const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Default, Deserialize)]
pub struct LabelListParams {
    pub assigned_only: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListParams {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

impl RecipeListParams {
    pub fn into_filter(self) -> Result<RecipeFilter, ApiError> {
        Ok(RecipeFilter {
            tags: parse_ids("tags", self.tags.as_deref())?,
            ingredients: parse_ids("ingredients", self.ingredients.as_deref())?,
        })
    }
}

/// Parses a comma separated id list such as `1,2,3`.
pub fn parse_ids(param: &str, raw: Option<&str>) -> Result<Vec<i32>, ApiError> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>().map_err(|_| {
                ApiError::bad_request(format!("'{}' must be a comma separated list of ids", param))
            })
        })
        .collect()
}

fn label_name(req: LabelRequest) -> Result<String, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Field 'name' may not be blank."));
    }
    Ok(name.to_string())
}

async fn invalidate_cache(state: &AppState, user_id: i32) -> Result<(), ApiError> {
    if let Some(cache) = state.cache.clone() {
        web::block(move || cache.invalidate(user_id)).await?;
    }
    Ok(())
}

async fn list_labels(
    kind: LabelKind,
    state: &AppState,
    user: AuthUser,
    params: LabelListParams,
) -> Result<HttpResponse, ApiError> {
    let assigned_only = params.assigned_only.unwrap_or(0) == 1;
    let user_id = user.id();
    let labels = db::run(state, move |conn| {
        query::list_labels(kind, user_id, assigned_only, conn)
    })
    .await?;
    Ok(HttpResponse::Ok().json(labels))
}

async fn create_label(
    kind: LabelKind,
    state: &AppState,
    user: AuthUser,
    req: LabelRequest,
) -> Result<HttpResponse, ApiError> {
    let name = label_name(req)?;
    let user_id = user.id();
    let label = db::run(state, move |conn| {
        query::create_label(kind, user_id, &name, conn)
    })
    .await?;
    Ok(HttpResponse::Created().json(label))
}

async fn rename_label(
    kind: LabelKind,
    state: &AppState,
    user: AuthUser,
    label_id: i32,
    req: LabelRequest,
) -> Result<HttpResponse, ApiError> {
    let name = label_name(req)?;
    let user_id = user.id();
    let label = db::run(state, move |conn| {
        query::rename_label(kind, user_id, label_id, &name, conn)
    })
    .await?;
    Ok(HttpResponse::Ok().json(label))
}

async fn delete_label(
    kind: LabelKind,
    state: &AppState,
    user: AuthUser,
    label_id: i32,
) -> Result<HttpResponse, ApiError> {
    let user_id = user.id();
    db::run(state, move |conn| {
        query::delete_label(kind, user_id, label_id, conn)
    })
    .await?;
    invalidate_cache(state, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/api/recipe/tags/")]
pub async fn list_tags(
    state: web::Data<AppState>,
    user: AuthUser,
    params: web::Query<LabelListParams>,
) -> Result<HttpResponse, ApiError> {
    list_labels(LabelKind::Tag, &state, user, params.into_inner()).await
}

#[post("/api/recipe/tags/")]
pub async fn create_tag(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<LabelRequest>,
) -> Result<HttpResponse, ApiError> {
    create_label(LabelKind::Tag, &state, user, body.into_inner()).await
}

#[put("/api/recipe/tags/{id}/")]
pub async fn replace_tag(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
    body: web::Json<LabelRequest>,
) -> Result<HttpResponse, ApiError> {
    rename_label(LabelKind::Tag, &state, user, id.into_inner(), body.into_inner()).await
}

#[patch("/api/recipe/tags/{id}/")]
pub async fn patch_tag(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
    body: web::Json<LabelRequest>,
) -> Result<HttpResponse, ApiError> {
    rename_label(LabelKind::Tag, &state, user, id.into_inner(), body.into_inner()).await
}

#[delete("/api/recipe/tags/{id}/")]
pub async fn delete_tag(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    delete_label(LabelKind::Tag, &state, user, id.into_inner()).await
}

#[get("/api/recipe/ingredients/")]
pub async fn list_ingredients(
    state: web::Data<AppState>,
    user: AuthUser,
    params: web::Query<LabelListParams>,
) -> Result<HttpResponse, ApiError> {
    list_labels(LabelKind::Ingredient, &state, user, params.into_inner()).await
}

#[post("/api/recipe/ingredients/")]
pub async fn create_ingredient(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<LabelRequest>,
) -> Result<HttpResponse, ApiError> {
    create_label(LabelKind::Ingredient, &state, user, body.into_inner()).await
}

#[put("/api/recipe/ingredients/{id}/")]
pub async fn replace_ingredient(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
    body: web::Json<LabelRequest>,
) -> Result<HttpResponse, ApiError> {
    rename_label(
        LabelKind::Ingredient,
        &state,
        user,
        id.into_inner(),
        body.into_inner(),
    )
    .await
}

#[patch("/api/recipe/ingredients/{id}/")]
pub async fn patch_ingredient(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
    body: web::Json<LabelRequest>,
) -> Result<HttpResponse, ApiError> {
    rename_label(
        LabelKind::Ingredient,
        &state,
        user,
        id.into_inner(),
        body.into_inner(),
    )
    .await
}

#[delete("/api/recipe/ingredients/{id}/")]
pub async fn delete_ingredient(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    delete_label(LabelKind::Ingredient, &state, user, id.into_inner()).await
}

#[get("/api/recipe/recipes/")]
pub async fn list_recipes(
    state: web::Data<AppState>,
    user: AuthUser,
    params: web::Query<RecipeListParams>,
) -> Result<HttpResponse, ApiError> {
    let filter = params.into_inner().into_filter()?;
    let user_id = user.id();
    // only the unfiltered list is cached
    let cache = if filter.is_empty() {
        state.cache.clone()
    } else {
        None
    };

    // the generation is read before the database so a concurrent write
    // sends this list to a key nobody reads
    let generation = match cache.clone() {
        Some(cache) => {
            let lookup = web::block(move || {
                cache
                    .generation(user_id)
                    .map(|generation| (generation, cache.get(user_id, generation)))
            })
            .await?;
            match lookup {
                Some((_, Some(recipes))) => return Ok(HttpResponse::Ok().json(recipes)),
                Some((generation, None)) => Some(generation),
                None => None,
            }
        }
        None => None,
    };

    let recipes = db::run(&state, move |conn| query::list_recipes(user_id, &filter, conn)).await?;

    if let (Some(cache), Some(generation)) = (cache, generation) {
        let cached = recipes.clone();
        web::block(move || cache.put(user_id, generation, &cached)).await?;
    }
    Ok(HttpResponse::Ok().json(recipes))
}

/// Field checks shared by create and update. `full` demands the fields a
/// recipe cannot exist without.
fn validate_recipe(req: &RecipeRequest, full: bool) -> Result<(), ApiError> {
    if full {
        for (field, present) in [
            ("title", req.title.is_some()),
            ("time_minutes", req.time_minutes.is_some()),
            ("price", req.price.is_some()),
        ] {
            if !present {
                return Err(ApiError::bad_request(format!("Field '{}' is required.", field)));
            }
        }
    }
    if let Some(title) = &req.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(ApiError::bad_request("Field 'title' may not be blank."));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ApiError::bad_request(format!(
                "Field 'title' may not exceed {} characters.",
                MAX_TITLE_LEN
            )));
        }
    }
    if matches!(req.time_minutes, Some(minutes) if minutes < 0) {
        return Err(ApiError::bad_request("Field 'time_minutes' may not be negative."));
    }
    if matches!(req.price, Some(price) if !price.is_finite() || price < 0.0) {
        return Err(ApiError::bad_request("Field 'price' must be a non-negative number."));
    }
    Ok(())
}

#[post("/api/recipe/recipes/")]
pub async fn create_recipe(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<RecipeRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();
    validate_recipe(&req, true)?;
    let user_id = user.id();

    let recipe = db::run(&state, move |conn| {
        let new = NewRecipe {
            user_id,
            title: req.title.as_deref().unwrap_or_default().trim(),
            description: req.description.as_deref().unwrap_or_default(),
            time_minutes: req.time_minutes.unwrap_or_default(),
            price: req.price.unwrap_or_default(),
            link: req.link.as_deref().unwrap_or_default(),
        };
        query::create_recipe(
            &new,
            req.tags.as_deref().unwrap_or_default(),
            req.ingredients.as_deref().unwrap_or_default(),
            conn,
        )
    })
    .await?;

    invalidate_cache(&state, user_id).await?;
    Ok(HttpResponse::Created().json(recipe))
}

#[get("/api/recipe/recipes/{id}/")]
pub async fn get_recipe(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let (user_id, recipe_id) = (user.id(), id.into_inner());
    let recipe = db::run(&state, move |conn| query::get_recipe(user_id, recipe_id, conn)).await?;
    Ok(HttpResponse::Ok().json(recipe))
}

async fn update_recipe(
    state: &AppState,
    user: AuthUser,
    recipe_id: i32,
    req: RecipeRequest,
    full: bool,
) -> Result<HttpResponse, ApiError> {
    validate_recipe(&req, full)?;
    let user_id = user.id();
    let changes = RecipeChanges {
        title: req.title.map(|title| title.trim().to_string()),
        description: if full {
            Some(req.description.unwrap_or_default())
        } else {
            req.description
        },
        time_minutes: req.time_minutes,
        price: req.price,
        link: if full {
            Some(req.link.unwrap_or_default())
        } else {
            req.link
        },
    };
    // a full update replaces the links too
    let (tags, ingredients) = if full {
        (
            Some(req.tags.unwrap_or_default()),
            Some(req.ingredients.unwrap_or_default()),
        )
    } else {
        (req.tags, req.ingredients)
    };

    let recipe = db::run(state, move |conn| {
        query::update_recipe(
            user_id,
            recipe_id,
            &changes,
            tags.as_deref(),
            ingredients.as_deref(),
            conn,
        )
    })
    .await?;

    invalidate_cache(state, user_id).await?;
    Ok(HttpResponse::Ok().json(recipe))
}

#[put("/api/recipe/recipes/{id}/")]
pub async fn replace_recipe(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
    body: web::Json<RecipeRequest>,
) -> Result<HttpResponse, ApiError> {
    update_recipe(&state, user, id.into_inner(), body.into_inner(), true).await
}

#[patch("/api/recipe/recipes/{id}/")]
pub async fn patch_recipe(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
    body: web::Json<RecipeRequest>,
) -> Result<HttpResponse, ApiError> {
    update_recipe(&state, user, id.into_inner(), body.into_inner(), false).await
}

#[delete("/api/recipe/recipes/{id}/")]
pub async fn delete_recipe(
    state: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let (user_id, recipe_id) = (user.id(), id.into_inner());
    db::run(&state, move |conn| query::delete_recipe(user_id, recipe_id, conn)).await?;
    invalidate_cache(&state, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_parse() {
        assert_eq!(parse_ids("tags", Some("1, 2,3")).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_ids("tags", Some("")).unwrap(), Vec::<i32>::new());
        assert!(parse_ids("tags", None).unwrap().is_empty());
        assert!(parse_ids("tags", Some("1,x")).is_err());
    }

    #[test]
    fn full_updates_need_required_fields() {
        let req = RecipeRequest {
            title: Some("Soup".to_string()),
            ..Default::default()
        };
        assert!(validate_recipe(&req, true).is_err());
        assert!(validate_recipe(&req, false).is_ok());
    }

    #[test]
    fn bad_values_are_rejected() {
        let blank = RecipeRequest {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(validate_recipe(&blank, false).is_err());
        let negative = RecipeRequest {
            price: Some(-1.0),
            ..Default::default()
        };
        assert!(validate_recipe(&negative, false).is_err());
        let slow = RecipeRequest {
            time_minutes: Some(-5),
            ..Default::default()
        };
        assert!(validate_recipe(&slow, false).is_err());
    }
}
