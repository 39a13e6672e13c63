table! {
    users (id) {
        id -> Integer,
        email -> Text,
        name -> Text,
        password_hash -> Text,
        token -> Nullable<Text>,
        is_active -> Bool,
    }
}

table! {
    recipes (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Text,
        description -> Text,
        time_minutes -> Integer,
        price -> Double,
        link -> Text,
    }
}

table! {
    ingredients (id) {
        id -> Integer,
        user_id -> Integer,
        name -> Text,
    }
}

table! {
    tags (id) {
        id -> Integer,
        user_id -> Integer,
        name -> Text,
    }
}

table! {
    recipe_ingredients (recipe_id, ingredient_id) {
        recipe_id -> Integer,
        ingredient_id -> Integer,
    }
}

table! {
    recipe_tags (recipe_id, tag_id) {
        recipe_id -> Integer,
        tag_id -> Integer,
    }
}

joinable!(recipes -> users (user_id));
joinable!(ingredients -> users (user_id));
joinable!(tags -> users (user_id));
joinable!(recipe_ingredients -> recipes (recipe_id));
joinable!(recipe_ingredients -> ingredients (ingredient_id));
joinable!(recipe_tags -> recipes (recipe_id));
joinable!(recipe_tags -> tags (tag_id));

allow_tables_to_appear_in_same_query!(
    users,
    recipes,
    ingredients,
    tags,
    recipe_ingredients,
    recipe_tags,
);

/// Tables every initialized database must contain.
pub const TABLE_NAMES: [&str; 6] = [
    "users",
    "recipes",
    "ingredients",
    "tags",
    "recipe_ingredients",
    "recipe_tags",
];
