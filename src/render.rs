//! HTML fragments for recipes and recipe history. All recipe text is escaped.

use std::fmt::Write;

use crate::{
    format::{escape_html, instruction_steps, mood_icon, mood_label, split_ingredient},
    model::{Recipe, RecipeHistory},
};

pub fn ingredients(items: &[String]) -> String {
    let mut html = String::new();
    for item in items {
        let ingredient = split_ingredient(item);
        html.push_str(r#"<li class="list-group-item ingredient-item">"#);
        if let Some(quantity) = &ingredient.quantity {
            let _ = write!(
                html,
                r#"<span class="ingredient-qty">{}</span> "#,
                escape_html(quantity)
            );
        }
        let _ = write!(
            html,
            r#"<span class="ingredient-name">{}</span></li>"#,
            escape_html(&ingredient.name)
        );
    }
    html
}

pub fn instructions(text: &str) -> String {
    instruction_steps(text)
        .iter()
        .map(|step| format!(r#"<p class="instruction-step">{}</p>"#, escape_html(step)))
        .collect()
}

fn recipe_card(recipe: &Recipe, mood: &str) -> String {
    let icon = mood_icon(mood);
    format!(
        r#"<div class="col-12 col-sm-6 col-lg-4">
  <div class="card h-100 glass-effect">
    <div class="card-header-gradient"><h5 class="card-title">{name}</h5></div>
    <div class="card-body">
      <div class="card-meta">
        <span class="badge"><i class="fas {icon}"></i> {label}</span>
        <div class="text-end">
          <small><i class="far fa-calendar-alt"></i> {created}</small><br>
          <small><i class="fas fa-map-marker-alt"></i> {city}</small>
        </div>
      </div>
      <p class="card-text"><i class="far fa-clock"></i> <strong>Prep Time:</strong> {prep}</p>
      <h6><i class="fas fa-carrot"></i> Ingredients:</h6>
      <ul class="list-group">{ingredients}</ul>
      <h6><i class="fas fa-clipboard-list"></i> Instructions:</h6>
      <div class="instruction-block">{instructions}</div>
    </div>
  </div>
</div>"#,
        name = escape_html(&recipe.name),
        label = escape_html(&mood_label(mood)),
        created = escape_html(recipe.created_at.as_deref().unwrap_or("")),
        city = escape_html(recipe.user_city.as_deref().unwrap_or("")),
        prep = escape_html(&recipe.prep_time),
        ingredients = ingredients(&recipe.ingredients),
        instructions = instructions(&recipe.instructions),
    )
}

/// One section per mood with a card per recipe, or the empty-state message.
pub fn history(recipes: &RecipeHistory) -> String {
    if recipes.values().all(|group| group.is_empty()) {
        return r#"<div class="col-12 text-center">
  <p class="text-muted">No recipes found for your IP address</p>
  <a href="/" class="btn btn-primary">Create Your First Recipe</a>
</div>"#
            .to_string();
    }

    let mut html = String::new();
    for (mood, group) in recipes.iter().filter(|(_, group)| !group.is_empty()) {
        let _ = write!(
            html,
            r#"<div class="col-12 mood-section">
  <h2 class="mood-section-title"><i class="fas {icon}"></i> <span class="badge">{label} Mood</span></h2>
  <div class="row">"#,
            icon = mood_icon(mood),
            label = escape_html(&mood_label(mood)),
        );
        for recipe in group.values() {
            html.push_str(&recipe_card(recipe, mood));
        }
        html.push_str("</div>\n</div>");
    }
    html
}

pub fn history_error(message: &str) -> String {
    format!(
        r#"<div class="col-12 text-center">
  <p class="text-danger">Error: {}</p>
  <a href="/" class="btn btn-primary">Return Home</a>
</div>"#,
        escape_html(message)
    )
}
