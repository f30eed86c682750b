use std::collections::HashSet;

use sqlx::{Postgres, Transaction};

use crate::db::{is_unique_violation, Database};
use crate::error::{AppError, AppResult};
use crate::models::coffee::{
    Coffee, CoffeePublic, CreateCoffeeRequest, PaginationQuery, UpdateCoffeeRequest,
};
use crate::models::event::Event;
use crate::models::flavor::Flavor;
use crate::services::event::EventService;

pub struct CoffeeService<'a> {
    db: &'a Database,
}

impl<'a> CoffeeService<'a> {
    pub fn new(db: &'a Database) -> Self {
        CoffeeService { db }
    }

    /// Skip/take pagination over store-default ordering; no limit when the
    /// caller supplies none.
    pub async fn find_all(&self, pagination: &PaginationQuery) -> AppResult<Vec<CoffeePublic>> {
        let coffees = sqlx::query_as::<_, Coffee>(
            r#"
            SELECT id, name, brand, recommendations
            FROM coffees
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(pagination.offset.unwrap_or(0))
        .bind(pagination.limit)
        .fetch_all(&self.db.pool)
        .await?;

        let mut result = Vec::with_capacity(coffees.len());
        for coffee in coffees {
            let flavors = self.flavor_names(coffee.id).await?;
            result.push(CoffeePublic::from_coffee(coffee, flavors));
        }

        Ok(result)
    }

    pub async fn find_one(&self, id: i64) -> AppResult<CoffeePublic> {
        let coffee = self.find_one_coffee(id).await?;
        let flavors = self.flavor_names(coffee.id).await?;

        Ok(CoffeePublic::from_coffee(coffee, flavors))
    }

    pub async fn create(&self, request: &CreateCoffeeRequest) -> AppResult<CoffeePublic> {
        ensure_distinct_flavors(&request.flavors)?;

        let coffee_id = self
            .db
            .run_in_transaction(|tx: &mut Transaction<'static, Postgres>| {
                // Each attempt of the restartable work owns its own copy.
                let request = request.clone();
                Box::pin(async move {
                    for name in &request.flavors {
                        preload_flavor_by_name(tx, name).await?;
                    }

                    let coffee_id: i32 = sqlx::query_scalar(
                        "INSERT INTO coffees (name, brand) VALUES ($1, $2) RETURNING id",
                    )
                    .bind(&request.name)
                    .bind(&request.brand)
                    .fetch_one(&mut **tx)
                    .await?;

                    for name in &request.flavors {
                        link_flavor_by_name(tx, coffee_id, name).await?;
                    }

                    Ok(coffee_id)
                })
            })
            .await?;

        self.find_one(i64::from(coffee_id)).await
    }

    /// Merge only the supplied fields onto the existing row. A supplied
    /// flavor list replaces the prior set entirely.
    pub async fn update(&self, id: i64, request: &UpdateCoffeeRequest) -> AppResult<CoffeePublic> {
        if let Some(flavors) = &request.flavors {
            ensure_distinct_flavors(flavors)?;
        }

        let Some(coffee_id) = narrow_coffee_id(id) else {
            return Err(not_found(id));
        };

        self.db
            .run_in_transaction(|tx: &mut Transaction<'static, Postgres>| {
                let request = request.clone();
                Box::pin(async move {
                    let updated = sqlx::query(
                        r#"
                        UPDATE coffees
                        SET name = COALESCE($2, name), brand = COALESCE($3, brand)
                        WHERE id = $1
                        "#,
                    )
                    .bind(coffee_id)
                    .bind(request.name.as_deref())
                    .bind(request.brand.as_deref())
                    .execute(&mut **tx)
                    .await?
                    .rows_affected();

                    if updated == 0 {
                        return Err(not_found(id));
                    }

                    if let Some(flavors) = &request.flavors {
                        for name in flavors {
                            preload_flavor_by_name(tx, name).await?;
                        }

                        sqlx::query("DELETE FROM coffees_flavors WHERE coffee_id = $1")
                            .bind(coffee_id)
                            .execute(&mut **tx)
                            .await?;

                        for name in flavors {
                            link_flavor_by_name(tx, coffee_id, name).await?;
                        }
                    }

                    Ok(())
                })
            })
            .await?;

        self.find_one(id).await
    }

    /// Delete the coffee if present. Association rows cascade; flavor rows
    /// are left behind.
    pub async fn remove(&self, id: i64) -> AppResult<bool> {
        let Some(coffee_id) = narrow_coffee_id(id) else {
            return Ok(false);
        };

        let deleted = sqlx::query("DELETE FROM coffees WHERE id = $1")
            .bind(coffee_id)
            .execute(&self.db.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    /// Increment the recommendation counter and append the matching event in
    /// one transaction. Never propagates an error: any failure, including an
    /// absent id, is logged and reported as `false`.
    pub async fn recommend(&self, id: i64) -> bool {
        match self.try_recommend(id).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Recommending coffee {} failed: {}", id, error);
                false
            }
        }
    }

    pub async fn find_recommendations(&self, id: i64) -> AppResult<Vec<Event>> {
        let Some(coffee_id) = narrow_coffee_id(id) else {
            return Ok(Vec::new());
        };

        EventService::new(self.db).find_by_coffee_id(coffee_id).await
    }

    async fn try_recommend(&self, id: i64) -> AppResult<()> {
        let Some(coffee_id) = narrow_coffee_id(id) else {
            return Err(not_found(id));
        };

        let db = self.db.clone();
        self.db
            .run_in_transaction(|tx: &mut Transaction<'static, Postgres>| {
                let db = db.clone();
                Box::pin(async move {
                    let updated = sqlx::query(
                        "UPDATE coffees SET recommendations = recommendations + 1 WHERE id = $1",
                    )
                    .bind(coffee_id)
                    .execute(&mut **tx)
                    .await?
                    .rows_affected();

                    if updated == 0 {
                        return Err(not_found(id));
                    }

                    EventService::new(&db)
                        .record(
                            tx,
                            "coffee",
                            "recommend_coffee",
                            serde_json::json!({ "coffeeId": coffee_id }),
                        )
                        .await?;

                    Ok(())
                })
            })
            .await
    }

    async fn find_one_coffee(&self, id: i64) -> AppResult<Coffee> {
        let Some(coffee_id) = narrow_coffee_id(id) else {
            return Err(not_found(id));
        };

        sqlx::query_as::<_, Coffee>(
            "SELECT id, name, brand, recommendations FROM coffees WHERE id = $1",
        )
        .bind(coffee_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn flavor_names(&self, coffee_id: i32) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT f.name
            FROM flavors f
            JOIN coffees_flavors cf ON cf.flavor_id = f.id
            WHERE cf.coffee_id = $1
            "#,
        )
        .bind(coffee_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(names)
    }
}

/// Get-or-create a flavor by exact name. Losing an insert race to a
/// concurrent writer counts as success: the returned flavor carries no id,
/// and association writes resolve the stored id through the unique name.
async fn preload_flavor_by_name(
    tx: &mut Transaction<'static, Postgres>,
    name: &str,
) -> AppResult<Flavor> {
    let existing = sqlx::query_as::<_, Flavor>("SELECT id, name FROM flavors WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;

    if let Some(flavor) = existing {
        return Ok(flavor);
    }

    match sqlx::query_as::<_, Flavor>("INSERT INTO flavors (name) VALUES ($1) RETURNING id, name")
        .bind(name)
        .fetch_one(&mut **tx)
        .await
    {
        Ok(flavor) => Ok(flavor),
        Err(error) if is_unique_violation(&error) => Ok(Flavor {
            id: None,
            name: name.to_string(),
        }),
        Err(error) => Err(error.into()),
    }
}

async fn link_flavor_by_name(
    tx: &mut Transaction<'static, Postgres>,
    coffee_id: i32,
    name: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO coffees_flavors (coffee_id, flavor_id)
        SELECT $1, id FROM flavors WHERE name = $2
        "#,
    )
    .bind(coffee_id)
    .bind(name)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn ensure_distinct_flavors(flavors: &[String]) -> AppResult<()> {
    let unique: HashSet<&str> = flavors.iter().map(String::as_str).collect();

    if unique.len() != flavors.len() {
        return Err(AppError::BadRequest(
            "flavors array must not have duplicates".to_string(),
        ));
    }

    Ok(())
}

/// Ids outside the store's INTEGER range fold into the same outcome as an
/// absent row, never a distinct validation error.
fn narrow_coffee_id(id: i64) -> Option<i32> {
    i32::try_from(id).ok()
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Coffee #{} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_flavors_pass() {
        let flavors = vec!["vanilla".to_string(), "chocolate".to_string()];
        assert!(ensure_distinct_flavors(&flavors).is_ok());
    }

    #[test]
    fn duplicated_flavors_are_rejected() {
        let flavors = vec!["vanilla".to_string(), "vanilla".to_string()];
        let error = ensure_distinct_flavors(&flavors).unwrap_err();
        assert_eq!(error.to_string(), "flavors array must not have duplicates");
    }

    #[test]
    fn duplicate_check_is_case_sensitive() {
        let flavors = vec!["Vanilla".to_string(), "vanilla".to_string()];
        assert!(ensure_distinct_flavors(&flavors).is_ok());
    }

    #[test]
    fn ids_beyond_integer_range_do_not_narrow() {
        assert_eq!(narrow_coffee_id(42), Some(42));
        assert_eq!(narrow_coffee_id(i64::from(i32::MAX)), Some(i32::MAX));
        assert_eq!(narrow_coffee_id(i64::from(i32::MAX) + 1), None);
        assert_eq!(narrow_coffee_id(i64::MAX), None);
    }

    #[test]
    fn not_found_uses_the_fixed_message_template() {
        assert_eq!(not_found(7).to_string(), "Coffee #7 not found");
    }
}
