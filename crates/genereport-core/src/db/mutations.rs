//! Mutation database operations.

use rusqlite::params;

use super::{Database, DbError, DbResult};
use crate::models::{Mutation, RelevanceTier};

impl Database {
    /// Insert a batch of mutations in one transaction.
    ///
    /// Either every row is written or none is.
    pub fn insert_mutations(&self, mutations: &[Mutation]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO mutations (
                    mutation_id, sample_id, result_file_id, gene, chromosome,
                    mutation_type, relevance, comment, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for m in mutations {
                stmt.execute(params![
                    m.mutation_id,
                    m.sample_id,
                    m.result_file_id,
                    m.gene,
                    m.chromosome,
                    m.mutation_type,
                    m.relevance.as_str(),
                    m.comment,
                    m.created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// List mutations for a sample in insertion order.
    pub fn list_mutations_for_sample(&self, sample_id: &str) -> DbResult<Vec<Mutation>> {
        self.query_mutations("WHERE sample_id = ?", sample_id)
    }

    /// List mutations extracted from one result file, in insertion order.
    pub fn list_mutations_for_result_file(&self, result_file_id: &str) -> DbResult<Vec<Mutation>> {
        self.query_mutations("WHERE result_file_id = ?", result_file_id)
    }

    /// Count mutations for a sample.
    pub fn count_mutations_for_sample(&self, sample_id: &str) -> DbResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM mutations WHERE sample_id = ?",
            [sample_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn query_mutations(&self, filter: &str, key: &str) -> DbResult<Vec<Mutation>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT mutation_id, sample_id, result_file_id, gene, chromosome,
                   mutation_type, relevance, comment, created_at
            FROM mutations
            {}
            ORDER BY rowid
            "#,
            filter
        ))?;

        let rows = stmt.query_map([key], |row| {
            Ok(MutationRow {
                mutation_id: row.get(0)?,
                sample_id: row.get(1)?,
                result_file_id: row.get(2)?,
                gene: row.get(3)?,
                chromosome: row.get(4)?,
                mutation_type: row.get(5)?,
                relevance: row.get(6)?,
                comment: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?;

        let mut mutations = Vec::new();
        for row in rows {
            mutations.push(row?.try_into()?);
        }
        Ok(mutations)
    }
}

/// Intermediate row struct for database mapping.
struct MutationRow {
    mutation_id: String,
    sample_id: String,
    result_file_id: String,
    gene: String,
    chromosome: String,
    mutation_type: String,
    relevance: String,
    comment: String,
    created_at: String,
}

impl TryFrom<MutationRow> for Mutation {
    type Error = DbError;

    fn try_from(row: MutationRow) -> Result<Self, Self::Error> {
        let relevance = RelevanceTier::parse(&row.relevance).ok_or_else(|| {
            DbError::Constraint(format!("Unknown relevance tier: {}", row.relevance))
        })?;

        Ok(Mutation {
            mutation_id: row.mutation_id,
            sample_id: row.sample_id,
            result_file_id: row.result_file_id,
            gene: row.gene,
            chromosome: row.chromosome,
            mutation_type: row.mutation_type,
            relevance,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::result_files::tests::{make_result_file, setup_db};
    use crate::models::MutationRecord;

    fn record(gene: &str, relevance: RelevanceTier) -> MutationRecord {
        MutationRecord {
            gene: gene.into(),
            chromosome: "17".into(),
            mutation_type: "SNV".into(),
            relevance,
            comment: String::new(),
        }
    }

    #[test]
    fn test_insert_batch_and_list_in_order() {
        let (db, sample_id) = setup_db();
        let file = make_result_file(&sample_id, "k1");
        db.insert_result_file(&file).unwrap();

        let batch: Vec<Mutation> = ["TP53", "BRCA1", "EGFR"]
            .iter()
            .map(|g| Mutation::from_record(record(g, RelevanceTier::High), &sample_id, &file.result_file_id))
            .collect();
        db.insert_mutations(&batch).unwrap();

        let listed = db.list_mutations_for_sample(&sample_id).unwrap();
        let genes: Vec<&str> = listed.iter().map(|m| m.gene.as_str()).collect();
        assert_eq!(genes, vec!["TP53", "BRCA1", "EGFR"]);
        assert_eq!(db.count_mutations_for_sample(&sample_id).unwrap(), 3);
        assert_eq!(
            db.list_mutations_for_result_file(&file.result_file_id)
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_batch_is_atomic() {
        let (db, sample_id) = setup_db();
        let file = make_result_file(&sample_id, "k1");
        db.insert_result_file(&file).unwrap();

        let good = Mutation::from_record(record("TP53", RelevanceTier::Low), &sample_id, &file.result_file_id);
        let mut duplicate = Mutation::from_record(record("KRAS", RelevanceTier::Low), &sample_id, &file.result_file_id);
        duplicate.mutation_id = good.mutation_id.clone();

        assert!(db.insert_mutations(&[good, duplicate]).is_err());
        assert_eq!(db.count_mutations_for_sample(&sample_id).unwrap(), 0);
    }

    #[test]
    fn test_mutations_are_immutable() {
        let (db, sample_id) = setup_db();
        let file = make_result_file(&sample_id, "k1");
        db.insert_result_file(&file).unwrap();
        db.insert_mutations(&[Mutation::from_record(
            record("TP53", RelevanceTier::Low),
            &sample_id,
            &file.result_file_id,
        )])
        .unwrap();

        let result = db
            .conn()
            .execute("UPDATE mutations SET gene = 'X'", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_cascade_on_result_file_delete() {
        let (db, sample_id) = setup_db();
        let file = make_result_file(&sample_id, "k1");
        db.insert_result_file(&file).unwrap();
        db.insert_mutations(&[Mutation::from_record(
            record("TP53", RelevanceTier::Medium),
            &sample_id,
            &file.result_file_id,
        )])
        .unwrap();

        db.delete_result_file(&file.result_file_id).unwrap();
        assert_eq!(db.count_mutations_for_sample(&sample_id).unwrap(), 0);
    }

    #[test]
    fn test_cascade_on_sample_delete() {
        let (db, sample_id) = setup_db();
        let file = make_result_file(&sample_id, "k1");
        db.insert_result_file(&file).unwrap();
        db.insert_mutations(&[Mutation::from_record(
            record("TP53", RelevanceTier::Medium),
            &sample_id,
            &file.result_file_id,
        )])
        .unwrap();

        db.delete_sample(&sample_id).unwrap();
        assert_eq!(db.count_mutations_for_sample(&sample_id).unwrap(), 0);
    }
}
