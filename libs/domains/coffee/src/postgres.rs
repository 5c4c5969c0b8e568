use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, DbBackend, DbErr, FromQueryResult, QueryResult, Statement, Value,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::CoffeeResult;
use crate::models::{Coffee, NearbyRoaster, Roaster, TextHit, TextSearch, VectorHit};
use crate::repository::CoffeeRepository;

const COFFEE_COLUMNS: &str = r#"
    c.id, c.name, c.roaster_id, r.name AS roaster_name, c.flavor_tags,
    c.roast_level, c.process_method, c.price::float8 AS price, c.is_featured, c.description
"#;

const ROASTER_COLUMNS: &str = r#"
    r.id, r.name, r.description, r.website, r.city, r.country,
    r.latitude::float8 AS latitude, r.longitude::float8 AS longitude, r.is_featured
"#;

/// Catalogue backed by the `coffees` and `roasters` tables (pgvector enabled).
#[derive(Clone)]
pub struct PostgresCoffeeRepository {
    db: Arc<DatabaseConnection>,
}

impl PostgresCoffeeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct CoffeeRow {
    id: Uuid,
    name: String,
    roaster_id: Uuid,
    roaster_name: Option<String>,
    flavor_tags: Option<Vec<String>>,
    roast_level: Option<String>,
    process_method: Option<String>,
    price: Option<f64>,
    is_featured: bool,
    description: Option<String>,
}

impl From<CoffeeRow> for Coffee {
    fn from(row: CoffeeRow) -> Self {
        Coffee {
            id: row.id,
            name: row.name,
            roaster_id: row.roaster_id,
            roaster_name: row.roaster_name,
            flavor_tags: row.flavor_tags.unwrap_or_default(),
            roast_level: row.roast_level,
            process_method: row.process_method,
            price: row.price,
            is_featured: row.is_featured,
            description: row.description,
        }
    }
}

#[derive(Debug)]
struct ScoredCoffeeRow {
    coffee: CoffeeRow,
    score: f64,
}

impl FromQueryResult for ScoredCoffeeRow {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        Ok(Self {
            coffee: CoffeeRow::from_query_result(res, pre)?,
            score: res.try_get(pre, "score")?,
        })
    }
}

#[derive(Debug, FromQueryResult)]
struct RoasterRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    website: Option<String>,
    city: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_featured: bool,
}

impl From<RoasterRow> for Roaster {
    fn from(row: RoasterRow) -> Self {
        Roaster {
            id: row.id,
            name: row.name,
            description: row.description,
            website: row.website,
            city: row.city,
            country: row.country,
            latitude: row.latitude,
            longitude: row.longitude,
            is_featured: row.is_featured,
        }
    }
}

#[derive(Debug)]
struct NearbyRoasterRow {
    roaster: RoasterRow,
    distance_km: f64,
}

impl FromQueryResult for NearbyRoasterRow {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        Ok(Self {
            roaster: RoasterRow::from_query_result(res, pre)?,
            distance_km: res.try_get(pre, "distance_km")?,
        })
    }
}

/// pgvector text literal, e.g. `[0.1,0.2,0.3]`
fn vector_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn as_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl CoffeeRepository for PostgresCoffeeRepository {
    async fn nearest_by_vector(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<VectorHit>> {
        // The SQL function only knows a match count, so the offset is applied outside it.
        let sql = format!(
            r#"
            SELECT {COFFEE_COLUMNS}, m.similarity::float8 AS score
            FROM search_coffee_by_flavor_vector($1::vector, $2, $3) m
            JOIN coffees c ON c.id = m.id
            LEFT JOIN roasters r ON r.id = c.roaster_id
            ORDER BY m.similarity DESC
            OFFSET $4
            "#
        );

        let values: [Value; 4] = [
            vector_literal(embedding).into(),
            threshold.into(),
            i32::try_from(limit.saturating_add(offset))
                .unwrap_or(i32::MAX)
                .into(),
            as_i64(offset).into(),
        ];
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);

        let rows = ScoredCoffeeRow::find_by_statement(stmt)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| VectorHit {
                coffee: row.coffee.into(),
                similarity: row.score,
            })
            .collect())
    }

    async fn nearest_by_tags(
        &self,
        tags: &[String],
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<Coffee>> {
        let sql = format!(
            r#"
            SELECT {COFFEE_COLUMNS}
            FROM coffees c
            LEFT JOIN roasters r ON r.id = c.roaster_id
            CROSS JOIN LATERAL (
                SELECT count(DISTINCT lower(t.tag)) AS overlap
                FROM unnest(c.flavor_tags) AS t(tag)
                WHERE lower(t.tag) = ANY($1)
            ) o
            WHERE o.overlap > 0
            ORDER BY o.overlap DESC, c.is_featured DESC, c.name ASC
            LIMIT $2 OFFSET $3
            "#
        );

        let lowered: Vec<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
        let values: [Value; 3] = [
            Value::from(lowered),
            as_i64(limit).into(),
            as_i64(offset).into(),
        ];
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);

        let rows = CoffeeRow::find_by_statement(stmt)
            .all(self.db.as_ref())
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search_by_text(
        &self,
        search: &TextSearch,
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<TextHit>> {
        let sql = format!(
            r#"
            SELECT {COFFEE_COLUMNS},
                CASE WHEN $1::text IS NULL THEN 0.0
                     ELSE ts_rank(
                        to_tsvector('english', c.name || ' ' || coalesce(c.description, '')
                            || ' ' || array_to_string(c.flavor_tags, ' ')),
                        plainto_tsquery('english', $1::text))
                END::float8 AS score
            FROM coffees c
            LEFT JOIN roasters r ON r.id = c.roaster_id
            WHERE ($1::text IS NULL OR
                   to_tsvector('english', c.name || ' ' || coalesce(c.description, '')
                       || ' ' || array_to_string(c.flavor_tags, ' '))
                   @@ plainto_tsquery('english', $1::text))
              AND ($2::text IS NULL OR c.roast_level = $2::text)
              AND ($3::text IS NULL OR c.process_method = $3::text)
              AND ($4::uuid IS NULL OR c.roaster_id = $4::uuid)
              AND (NOT $5 OR c.is_featured)
            ORDER BY score DESC, c.is_featured DESC, c.name ASC
            LIMIT $6 OFFSET $7
            "#
        );

        let filters = &search.filters;
        let values: [Value; 7] = [
            search.text.clone().into(),
            filters.roast_level.clone().into(),
            filters.process_method.clone().into(),
            filters.roaster_id.into(),
            filters.featured_only.into(),
            as_i64(limit).into(),
            as_i64(offset).into(),
        ];
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);

        let rows = ScoredCoffeeRow::find_by_statement(stmt)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| TextHit {
                coffee: row.coffee.into(),
                rank: row.score,
            })
            .collect())
    }

    async fn nearest_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: usize,
    ) -> CoffeeResult<Vec<NearbyRoaster>> {
        let sql = format!(
            r#"
            SELECT * FROM (
                SELECT {ROASTER_COLUMNS},
                    (6371.0 * 2 * asin(sqrt(
                        power(sin(radians(r.latitude - $1) / 2), 2)
                        + cos(radians($1)) * cos(radians(r.latitude))
                        * power(sin(radians(r.longitude - $2) / 2), 2)
                    )))::float8 AS distance_km
                FROM roasters r
                WHERE r.latitude IS NOT NULL AND r.longitude IS NOT NULL
            ) nearby
            WHERE distance_km <= $3
            ORDER BY distance_km ASC
            LIMIT $4
            "#
        );

        let values: [Value; 4] = [
            latitude.into(),
            longitude.into(),
            radius_km.into(),
            as_i64(limit).into(),
        ];
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);

        let rows = NearbyRoasterRow::find_by_statement(stmt)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| NearbyRoaster {
                roaster: row.roaster.into(),
                distance_km: row.distance_km,
            })
            .collect())
    }

    async fn get_roaster(&self, id: Uuid) -> CoffeeResult<Option<Roaster>> {
        let sql = format!("SELECT {ROASTER_COLUMNS} FROM roasters r WHERE r.id = $1");
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let row = RoasterRow::find_by_statement(stmt)
            .one(self.db.as_ref())
            .await?;

        Ok(row.map(Into::into))
    }
}
