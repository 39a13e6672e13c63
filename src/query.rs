use std::collections::{BTreeSet, HashMap};

use diesel::prelude::*;

use crate::auth;
use crate::error::ApiError;
use crate::models::{
    Label, LabelKind, NewIngredient, NewRecipe, NewTag, NewUser, Recipe, RecipeChanges,
    RecipeDetail, RecipeIngredient, RecipeSummary, RecipeTag, User, UserChanges,
};
use crate::schema::{ingredients, recipe_ingredients, recipe_tags, recipes, tags, users};

type DbResult<T> = Result<T, ApiError>;

no_arg_sql_function!(
    last_insert_rowid,
    diesel::sql_types::Integer,
    "Rowid of the last row inserted on this connection"
);

fn last_id(conn: &SqliteConnection) -> DbResult<i32> {
    Ok(diesel::select(last_insert_rowid).get_result::<i32>(conn)?)
}

/// Narrows a recipe listing to recipes linked to any of the given ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

impl RecipeFilter {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.ingredients.is_empty()
    }
}

pub(crate) fn create_user(
    email: &str,
    name: &str,
    password_hash: &str,
    conn: &SqliteConnection,
) -> DbResult<User> {
    conn.transaction::<_, ApiError, _>(|| {
        diesel::insert_into(users::table)
            .values(&NewUser {
                email,
                name,
                password_hash,
                is_active: true,
            })
            .execute(conn)?;
        let id = last_id(conn)?;
        Ok(users::table.find(id).first::<User>(conn)?)
    })
}

pub(crate) fn find_user(user_id: i32, conn: &SqliteConnection) -> DbResult<User> {
    users::table
        .find(user_id)
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("User"))
}

pub(crate) fn find_user_by_email(email: &str, conn: &SqliteConnection) -> DbResult<Option<User>> {
    Ok(users::table
        .filter(users::email.eq(email))
        .first::<User>(conn)
        .optional()?)
}

pub(crate) fn find_user_by_token(token: &str, conn: &SqliteConnection) -> DbResult<Option<User>> {
    Ok(users::table
        .filter(users::token.eq(token))
        .first::<User>(conn)
        .optional()?)
}

/// Returns the user's token, creating one on first use.
pub(crate) fn issue_token(user: &User, conn: &SqliteConnection) -> DbResult<String> {
    if let Some(token) = &user.token {
        return Ok(token.clone());
    }
    // `user` may be stale: only write when no token is stored yet, then hand
    // back whichever token won
    let fresh = auth::generate_token();
    diesel::update(users::table.find(user.id).filter(users::token.is_null()))
        .set(users::token.eq(fresh.as_str()))
        .execute(conn)?;
    let stored: Option<String> = users::table
        .find(user.id)
        .select(users::token)
        .first(conn)?;
    stored.ok_or_else(|| ApiError::Internal(format!("no token stored for user {}", user.id)))
}

pub(crate) fn update_user(
    user_id: i32,
    changes: &UserChanges,
    conn: &SqliteConnection,
) -> DbResult<User> {
    if !changes.is_empty() {
        diesel::update(users::table.find(user_id))
            .set(changes)
            .execute(conn)?;
    }
    find_user(user_id, conn)
}

pub(crate) fn list_labels(
    kind: LabelKind,
    user_id: i32,
    assigned_only: bool,
    conn: &SqliteConnection,
) -> DbResult<Vec<Label>> {
    let labels = match kind {
        LabelKind::Tag => {
            let mut query = tags::table.filter(tags::user_id.eq(user_id)).into_boxed();
            if assigned_only {
                let assigned: Vec<i32> = recipe_tags::table
                    .select(recipe_tags::tag_id)
                    .distinct()
                    .load(conn)?;
                query = query.filter(tags::id.eq_any(assigned));
            }
            query.order(tags::name.desc()).load::<Label>(conn)?
        }
        LabelKind::Ingredient => {
            let mut query = ingredients::table
                .filter(ingredients::user_id.eq(user_id))
                .into_boxed();
            if assigned_only {
                let assigned: Vec<i32> = recipe_ingredients::table
                    .select(recipe_ingredients::ingredient_id)
                    .distinct()
                    .load(conn)?;
                query = query.filter(ingredients::id.eq_any(assigned));
            }
            query.order(ingredients::name.desc()).load::<Label>(conn)?
        }
    };
    Ok(labels)
}

pub(crate) fn create_label(
    kind: LabelKind,
    user_id: i32,
    name: &str,
    conn: &SqliteConnection,
) -> DbResult<Label> {
    conn.transaction::<_, ApiError, _>(|| {
        match kind {
            LabelKind::Tag => diesel::insert_into(tags::table)
                .values(&NewTag { user_id, name })
                .execute(conn)?,
            LabelKind::Ingredient => diesel::insert_into(ingredients::table)
                .values(&NewIngredient { user_id, name })
                .execute(conn)?,
        };
        let id = last_id(conn)?;
        find_label(kind, user_id, id, conn)
    })
}

/// Labels of other users are reported as missing.
pub(crate) fn find_label(
    kind: LabelKind,
    user_id: i32,
    label_id: i32,
    conn: &SqliteConnection,
) -> DbResult<Label> {
    let label = match kind {
        LabelKind::Tag => tags::table
            .find(label_id)
            .filter(tags::user_id.eq(user_id))
            .first::<Label>(conn)
            .optional()?,
        LabelKind::Ingredient => ingredients::table
            .find(label_id)
            .filter(ingredients::user_id.eq(user_id))
            .first::<Label>(conn)
            .optional()?,
    };
    label.ok_or_else(|| ApiError::not_found(capitalize(kind.as_str())))
}

pub(crate) fn rename_label(
    kind: LabelKind,
    user_id: i32,
    label_id: i32,
    name: &str,
    conn: &SqliteConnection,
) -> DbResult<Label> {
    find_label(kind, user_id, label_id, conn)?;
    match kind {
        LabelKind::Tag => diesel::update(tags::table.find(label_id))
            .set(tags::name.eq(name))
            .execute(conn)?,
        LabelKind::Ingredient => diesel::update(ingredients::table.find(label_id))
            .set(ingredients::name.eq(name))
            .execute(conn)?,
    };
    find_label(kind, user_id, label_id, conn)
}

pub(crate) fn delete_label(
    kind: LabelKind,
    user_id: i32,
    label_id: i32,
    conn: &SqliteConnection,
) -> DbResult<()> {
    find_label(kind, user_id, label_id, conn)?;
    conn.transaction::<_, ApiError, _>(|| {
        match kind {
            LabelKind::Tag => {
                diesel::delete(recipe_tags::table.filter(recipe_tags::tag_id.eq(label_id)))
                    .execute(conn)?;
                diesel::delete(tags::table.find(label_id)).execute(conn)?;
            }
            LabelKind::Ingredient => {
                diesel::delete(
                    recipe_ingredients::table
                        .filter(recipe_ingredients::ingredient_id.eq(label_id)),
                )
                .execute(conn)?;
                diesel::delete(ingredients::table.find(label_id)).execute(conn)?;
            }
        }
        Ok(())
    })
}

/// Fails unless every id names a label owned by the user.
fn check_owned_labels(
    kind: LabelKind,
    user_id: i32,
    ids: &BTreeSet<i32>,
    conn: &SqliteConnection,
) -> DbResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let wanted: Vec<i32> = ids.iter().copied().collect();
    let found: Vec<i32> = match kind {
        LabelKind::Tag => tags::table
            .filter(tags::user_id.eq(user_id))
            .filter(tags::id.eq_any(wanted))
            .select(tags::id)
            .load(conn)?,
        LabelKind::Ingredient => ingredients::table
            .filter(ingredients::user_id.eq(user_id))
            .filter(ingredients::id.eq_any(wanted))
            .select(ingredients::id)
            .load(conn)?,
    };
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(|id| id.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Invalid {} id(s): {}",
            kind.as_str(),
            missing.join(", ")
        )))
    }
}

fn set_recipe_labels(
    kind: LabelKind,
    recipe_id: i32,
    ids: &BTreeSet<i32>,
    conn: &SqliteConnection,
) -> DbResult<()> {
    match kind {
        LabelKind::Tag => {
            diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
                .execute(conn)?;
            for &tag_id in ids {
                diesel::insert_into(recipe_tags::table)
                    .values(&RecipeTag { recipe_id, tag_id })
                    .execute(conn)?;
            }
        }
        LabelKind::Ingredient => {
            diesel::delete(
                recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)),
            )
            .execute(conn)?;
            for &ingredient_id in ids {
                diesel::insert_into(recipe_ingredients::table)
                    .values(&RecipeIngredient {
                        recipe_id,
                        ingredient_id,
                    })
                    .execute(conn)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn recipe_labels(
    kind: LabelKind,
    recipe_id: i32,
    conn: &SqliteConnection,
) -> DbResult<Vec<Label>> {
    let labels = match kind {
        LabelKind::Tag => tags::table
            .inner_join(recipe_tags::table)
            .filter(recipe_tags::recipe_id.eq(recipe_id))
            .select(tags::all_columns)
            .order(tags::name.asc())
            .load::<Label>(conn)?,
        LabelKind::Ingredient => ingredients::table
            .inner_join(recipe_ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .select(ingredients::all_columns)
            .order(ingredients::name.asc())
            .load::<Label>(conn)?,
    };
    Ok(labels)
}

pub(crate) fn list_recipes(
    user_id: i32,
    filter: &RecipeFilter,
    conn: &SqliteConnection,
) -> DbResult<Vec<RecipeSummary>> {
    let mut query = recipes::table
        .filter(recipes::user_id.eq(user_id))
        .into_boxed();
    if !filter.tags.is_empty() {
        let matching: Vec<i32> = recipe_tags::table
            .filter(recipe_tags::tag_id.eq_any(filter.tags.clone()))
            .select(recipe_tags::recipe_id)
            .load(conn)?;
        query = query.filter(recipes::id.eq_any(matching));
    }
    if !filter.ingredients.is_empty() {
        let matching: Vec<i32> = recipe_ingredients::table
            .filter(recipe_ingredients::ingredient_id.eq_any(filter.ingredients.clone()))
            .select(recipe_ingredients::recipe_id)
            .load(conn)?;
        query = query.filter(recipes::id.eq_any(matching));
    }
    let found = query.order(recipes::id.desc()).load::<Recipe>(conn)?;

    let ids: Vec<i32> = found.iter().map(|r| r.id).collect();
    let mut tag_links: HashMap<i32, Vec<i32>> = HashMap::new();
    for (recipe_id, tag_id) in recipe_tags::table
        .filter(recipe_tags::recipe_id.eq_any(ids.clone()))
        .order(recipe_tags::tag_id.asc())
        .load::<(i32, i32)>(conn)?
    {
        tag_links.entry(recipe_id).or_default().push(tag_id);
    }
    let mut ingredient_links: HashMap<i32, Vec<i32>> = HashMap::new();
    for (recipe_id, ingredient_id) in recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq_any(ids))
        .order(recipe_ingredients::ingredient_id.asc())
        .load::<(i32, i32)>(conn)?
    {
        ingredient_links
            .entry(recipe_id)
            .or_default()
            .push(ingredient_id);
    }

    Ok(found
        .into_iter()
        .map(|r| RecipeSummary {
            tags: tag_links.remove(&r.id).unwrap_or_default(),
            ingredients: ingredient_links.remove(&r.id).unwrap_or_default(),
            id: r.id,
            title: r.title,
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link,
        })
        .collect())
}

/// Every recipe of every user, for the public pages.
pub(crate) fn list_all_recipes(conn: &SqliteConnection) -> DbResult<Vec<Recipe>> {
    Ok(recipes::table
        .order(recipes::title.asc())
        .load::<Recipe>(conn)?)
}

pub(crate) fn find_recipe(recipe_id: i32, conn: &SqliteConnection) -> DbResult<Option<Recipe>> {
    Ok(recipes::table
        .find(recipe_id)
        .first::<Recipe>(conn)
        .optional()?)
}

fn find_owned_recipe(user_id: i32, recipe_id: i32, conn: &SqliteConnection) -> DbResult<Recipe> {
    match find_recipe(recipe_id, conn)? {
        Some(recipe) if recipe.user_id == user_id => Ok(recipe),
        _ => Err(ApiError::not_found("Recipe")),
    }
}

pub(crate) fn recipe_detail(recipe: Recipe, conn: &SqliteConnection) -> DbResult<RecipeDetail> {
    let tags = recipe_labels(LabelKind::Tag, recipe.id, conn)?;
    let ingredients = recipe_labels(LabelKind::Ingredient, recipe.id, conn)?;
    Ok(RecipeDetail::new(recipe, tags, ingredients))
}

pub(crate) fn get_recipe(
    user_id: i32,
    recipe_id: i32,
    conn: &SqliteConnection,
) -> DbResult<RecipeDetail> {
    let recipe = find_owned_recipe(user_id, recipe_id, conn)?;
    recipe_detail(recipe, conn)
}

pub(crate) fn create_recipe(
    new: &NewRecipe,
    tag_ids: &[i32],
    ingredient_ids: &[i32],
    conn: &SqliteConnection,
) -> DbResult<RecipeDetail> {
    let tag_ids: BTreeSet<i32> = tag_ids.iter().copied().collect();
    let ingredient_ids: BTreeSet<i32> = ingredient_ids.iter().copied().collect();
    check_owned_labels(LabelKind::Tag, new.user_id, &tag_ids, conn)?;
    check_owned_labels(LabelKind::Ingredient, new.user_id, &ingredient_ids, conn)?;

    conn.transaction::<_, ApiError, _>(|| {
        diesel::insert_into(recipes::table)
            .values(new)
            .execute(conn)?;
        let id = last_id(conn)?;
        set_recipe_labels(LabelKind::Tag, id, &tag_ids, conn)?;
        set_recipe_labels(LabelKind::Ingredient, id, &ingredient_ids, conn)?;
        get_recipe(new.user_id, id, conn)
    })
}

/// Applies field changes and, when given, replaces the linked labels.
pub(crate) fn update_recipe(
    user_id: i32,
    recipe_id: i32,
    changes: &RecipeChanges,
    tag_ids: Option<&[i32]>,
    ingredient_ids: Option<&[i32]>,
    conn: &SqliteConnection,
) -> DbResult<RecipeDetail> {
    find_owned_recipe(user_id, recipe_id, conn)?;
    let tag_ids: Option<BTreeSet<i32>> = tag_ids.map(|ids| ids.iter().copied().collect());
    let ingredient_ids: Option<BTreeSet<i32>> =
        ingredient_ids.map(|ids| ids.iter().copied().collect());
    if let Some(ids) = &tag_ids {
        check_owned_labels(LabelKind::Tag, user_id, ids, conn)?;
    }
    if let Some(ids) = &ingredient_ids {
        check_owned_labels(LabelKind::Ingredient, user_id, ids, conn)?;
    }

    conn.transaction::<_, ApiError, _>(|| {
        if !changes.is_empty() {
            diesel::update(recipes::table.find(recipe_id))
                .set(changes)
                .execute(conn)?;
        }
        if let Some(ids) = &tag_ids {
            set_recipe_labels(LabelKind::Tag, recipe_id, ids, conn)?;
        }
        if let Some(ids) = &ingredient_ids {
            set_recipe_labels(LabelKind::Ingredient, recipe_id, ids, conn)?;
        }
        get_recipe(user_id, recipe_id, conn)
    })
}

pub(crate) fn delete_recipe(user_id: i32, recipe_id: i32, conn: &SqliteConnection) -> DbResult<()> {
    find_owned_recipe(user_id, recipe_id, conn)?;
    conn.transaction::<_, ApiError, _>(|| {
        diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
            .execute(conn)?;
        diesel::delete(
            recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)),
        )
        .execute(conn)?;
        diesel::delete(recipes::table.find(recipe_id)).execute(conn)?;
        Ok(())
    })
}

pub(crate) fn count_recipes(conn: &SqliteConnection) -> DbResult<i64> {
    Ok(recipes::table.count().get_result::<i64>(conn)?)
}

#[cfg(test)]
pub(crate) fn count_recipe_links(recipe_id: i32, conn: &SqliteConnection) -> DbResult<i64> {
    let tags: i64 = recipe_tags::table
        .filter(recipe_tags::recipe_id.eq(recipe_id))
        .count()
        .get_result(conn)?;
    let ingredients: i64 = recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq(recipe_id))
        .count()
        .get_result(conn)?;
    Ok(tags + ingredients)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn conn() -> SqliteConnection {
        let conn = SqliteConnection::establish(":memory:").unwrap();
        db::create_schema(&conn).unwrap();
        conn
    }

    fn user(email: &str, conn: &SqliteConnection) -> User {
        create_user(email, "Cook", "hash", conn).unwrap()
    }

    fn recipe<'a>(user_id: i32, title: &'a str) -> NewRecipe<'a> {
        NewRecipe {
            user_id,
            title,
            description: "",
            time_minutes: 10,
            price: 5.0,
            link: "",
        }
    }

    #[test]
    fn token_is_issued_once() {
        let conn = conn();
        let u = user("a@example.com", &conn);
        let token = issue_token(&u, &conn).unwrap();
        let reloaded = find_user_by_token(&token, &conn).unwrap().unwrap();
        assert_eq!(reloaded.id, u.id);
        assert_eq!(issue_token(&reloaded, &conn).unwrap(), token);
    }

    #[test]
    fn overlapping_logins_share_one_token() {
        let conn = conn();
        let stale = user("a@example.com", &conn);
        assert!(stale.token.is_none());

        let first = issue_token(&stale, &conn).unwrap();
        let second = issue_token(&stale, &conn).unwrap();
        assert_eq!(first, second);
        assert_eq!(find_user_by_token(&first, &conn).unwrap().unwrap().id, stale.id);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let conn = conn();
        user("a@example.com", &conn);
        let err = create_user("a@example.com", "Other", "hash", &conn).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn labels_are_scoped_and_sorted() {
        let conn = conn();
        let a = user("a@example.com", &conn);
        let b = user("b@example.com", &conn);
        create_label(LabelKind::Tag, a.id, "Dessert", &conn).unwrap();
        create_label(LabelKind::Tag, a.id, "Vegan", &conn).unwrap();
        let foreign = create_label(LabelKind::Tag, b.id, "Fruity", &conn).unwrap();

        let names: Vec<String> = list_labels(LabelKind::Tag, a.id, false, &conn)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Vegan", "Dessert"]);
        assert!(matches!(
            find_label(LabelKind::Tag, a.id, foreign.id, &conn),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn assigned_only_hides_unused_labels() {
        let conn = conn();
        let u = user("a@example.com", &conn);
        let used = create_label(LabelKind::Ingredient, u.id, "Eggs", &conn).unwrap();
        create_label(LabelKind::Ingredient, u.id, "Salt", &conn).unwrap();
        create_recipe(&recipe(u.id, "Omelette"), &[], &[used.id], &conn).unwrap();

        let assigned = list_labels(LabelKind::Ingredient, u.id, true, &conn).unwrap();
        assert_eq!(assigned, vec![used]);
        assert_eq!(list_labels(LabelKind::Ingredient, u.id, false, &conn).unwrap().len(), 2);
    }

    #[test]
    fn recipe_rejects_foreign_labels() {
        let conn = conn();
        let a = user("a@example.com", &conn);
        let b = user("b@example.com", &conn);
        let foreign = create_label(LabelKind::Tag, b.id, "Theirs", &conn).unwrap();
        let err = create_recipe(&recipe(a.id, "Soup"), &[foreign.id], &[], &conn).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(count_recipes(&conn).unwrap(), 0);
    }

    #[test]
    fn filters_match_any_listed_label() {
        let conn = conn();
        let u = user("a@example.com", &conn);
        let vegan = create_label(LabelKind::Tag, u.id, "Vegan", &conn).unwrap();
        let quick = create_label(LabelKind::Tag, u.id, "Quick", &conn).unwrap();
        let tofu = create_label(LabelKind::Ingredient, u.id, "Tofu", &conn).unwrap();
        let bowl = create_recipe(&recipe(u.id, "Bowl"), &[vegan.id], &[tofu.id], &conn).unwrap();
        let toast = create_recipe(&recipe(u.id, "Toast"), &[quick.id], &[], &conn).unwrap();
        create_recipe(&recipe(u.id, "Stew"), &[], &[], &conn).unwrap();

        let by_tag = RecipeFilter {
            tags: vec![vegan.id, quick.id],
            ..Default::default()
        };
        let ids: Vec<i32> = list_recipes(u.id, &by_tag, &conn)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![toast.id, bowl.id]);

        let by_ingredient = RecipeFilter {
            ingredients: vec![tofu.id],
            ..Default::default()
        };
        let found = list_recipes(u.id, &by_ingredient, &conn).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tags, vec![vegan.id]);
        assert_eq!(found[0].ingredients, vec![tofu.id]);
    }

    #[test]
    fn update_replaces_links_only_when_given() {
        let conn = conn();
        let u = user("a@example.com", &conn);
        let vegan = create_label(LabelKind::Tag, u.id, "Vegan", &conn).unwrap();
        let dinner = create_label(LabelKind::Tag, u.id, "Dinner", &conn).unwrap();
        let created = create_recipe(&recipe(u.id, "Curry"), &[vegan.id], &[], &conn).unwrap();

        let changes = RecipeChanges {
            title: Some("Green Curry".to_string()),
            ..Default::default()
        };
        let patched = update_recipe(u.id, created.id, &changes, None, None, &conn).unwrap();
        assert_eq!(patched.title, "Green Curry");
        assert_eq!(patched.tags, vec![vegan.clone()]);

        let replaced = update_recipe(
            u.id,
            created.id,
            &RecipeChanges::default(),
            Some(&[dinner.id, dinner.id][..]),
            None,
            &conn,
        )
        .unwrap();
        assert_eq!(replaced.tags, vec![dinner]);
    }

    #[test]
    fn delete_removes_join_rows() {
        let conn = conn();
        let u = user("a@example.com", &conn);
        let tag = create_label(LabelKind::Tag, u.id, "Quick", &conn).unwrap();
        let ing = create_label(LabelKind::Ingredient, u.id, "Bread", &conn).unwrap();
        let created = create_recipe(&recipe(u.id, "Toast"), &[tag.id], &[ing.id], &conn).unwrap();
        assert_eq!(count_recipe_links(created.id, &conn).unwrap(), 2);

        delete_recipe(u.id, created.id, &conn).unwrap();
        assert_eq!(count_recipe_links(created.id, &conn).unwrap(), 0);
        assert!(find_recipe(created.id, &conn).unwrap().is_none());
    }

    #[test]
    fn deleting_label_unlinks_it() {
        let conn = conn();
        let u = user("a@example.com", &conn);
        let tag = create_label(LabelKind::Tag, u.id, "Quick", &conn).unwrap();
        let created = create_recipe(&recipe(u.id, "Toast"), &[tag.id], &[], &conn).unwrap();
        delete_label(LabelKind::Tag, u.id, tag.id, &conn).unwrap();
        assert!(get_recipe(u.id, created.id, &conn).unwrap().tags.is_empty());
    }

    #[test]
    fn other_users_recipes_are_hidden() {
        let conn = conn();
        let a = user("a@example.com", &conn);
        let b = user("b@example.com", &conn);
        let theirs = create_recipe(&recipe(b.id, "Secret"), &[], &[], &conn).unwrap();
        assert!(list_recipes(a.id, &RecipeFilter::default(), &conn)
            .unwrap()
            .is_empty());
        assert!(matches!(
            delete_recipe(a.id, theirs.id, &conn),
            Err(ApiError::NotFound(_))
        ));
    }
}
