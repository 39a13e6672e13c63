//! Server-rendered pages.

use actix_web::http::header::ContentType;
use actix_web::{get, web, HttpResponse};

use crate::db;
use crate::error::ApiError;
use crate::models::{Recipe, RecipeDetail};
use crate::query;
use crate::AppState;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} | Recipes</title>\n</head>\n<body>\n\
         <nav><a href=\"/\">All recipes</a> &middot; <a href=\"/api\">API</a></nav>\n\
         {}\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}

fn html(status: actix_web::http::StatusCode, page: String) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header(ContentType::html())
        .body(page)
}

pub fn render_index(recipes: &[Recipe]) -> String {
    let mut body = String::from("<h1>Recipes</h1>\n");
    if recipes.is_empty() {
        body.push_str("<p>No recipes yet.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for recipe in recipes {
            body.push_str(&format!(
                "<li><a href=\"/recipes/{}/\">{}</a> ({} min, ${:.2})</li>\n",
                recipe.id,
                escape_html(&recipe.title),
                recipe.time_minutes,
                recipe.price
            ));
        }
        body.push_str("</ul>\n");
    }
    layout("All recipes", &body)
}

pub fn render_recipe(recipe: &RecipeDetail) -> String {
    let mut body = format!(
        "<h1>{}</h1>\n<p>{} minutes &middot; ${:.2}</p>\n",
        escape_html(&recipe.title),
        recipe.time_minutes,
        recipe.price
    );
    if !recipe.description.is_empty() {
        body.push_str(&format!("<p>{}</p>\n", escape_html(&recipe.description)));
    }
    if !recipe.link.is_empty() {
        body.push_str(&format!(
            "<p><a href=\"{0}\">{0}</a></p>\n",
            escape_html(&recipe.link)
        ));
    }
    for (heading, labels) in [("Ingredients", &recipe.ingredients), ("Tags", &recipe.tags)] {
        body.push_str(&format!("<h2>{}</h2>\n", heading));
        if labels.is_empty() {
            body.push_str("<p>None</p>\n");
            continue;
        }
        body.push_str("<ul>\n");
        for label in labels {
            body.push_str(&format!("<li>{}</li>\n", escape_html(&label.name)));
        }
        body.push_str("</ul>\n");
    }
    layout(&recipe.title, &body)
}

#[get("/")]
pub async fn index(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let recipes = db::run(&state, query::list_all_recipes).await?;
    Ok(html(actix_web::http::StatusCode::OK, render_index(&recipes)))
}

#[get("/recipes/{id}/")]
pub async fn recipe_page(
    state: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = id.into_inner();
    let recipe = db::run(&state, move |conn| match query::find_recipe(recipe_id, conn)? {
        Some(recipe) => query::recipe_detail(recipe, conn).map(Some),
        None => Ok(None),
    })
    .await?;

    Ok(match recipe {
        Some(recipe) => html(actix_web::http::StatusCode::OK, render_recipe(&recipe)),
        None => html(
            actix_web::http::StatusCode::NOT_FOUND,
            layout("Not found", "<h1>Recipe not found</h1>\n"),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;

    #[test]
    fn markup_is_escaped() {
        assert_eq!(
            escape_html("<b>\"Mac\" & 'cheese'</b>"),
            "&lt;b&gt;&quot;Mac&quot; &amp; &#x27;cheese&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn index_links_each_recipe() {
        let recipes = vec![Recipe {
            id: 4,
            user_id: 1,
            title: "Fish & Chips".to_string(),
            description: String::new(),
            time_minutes: 30,
            price: 9.0,
            link: String::new(),
        }];
        let page = render_index(&recipes);
        assert!(page.contains("href=\"/recipes/4/\""));
        assert!(page.contains("Fish &amp; Chips"));
        assert!(render_index(&[]).contains("No recipes yet."));
    }

    #[test]
    fn recipe_page_lists_labels() {
        let detail = RecipeDetail {
            id: 1,
            title: "Shortbread".to_string(),
            description: "Slow oven.".to_string(),
            time_minutes: 50,
            price: 4.25,
            link: String::new(),
            tags: vec![],
            ingredients: vec![Label {
                id: 2,
                user_id: 1,
                name: "Butter".to_string(),
            }],
        };
        let page = render_recipe(&detail);
        assert!(page.contains("<li>Butter</li>"));
        assert!(page.contains("$4.25"));
        assert!(page.contains("<h2>Tags</h2>\n<p>None</p>"));
    }
}
