//! Startup audit trail of generated and ignored routes

use crate::catalog::DatabaseObjectCategory;
use crate::config::ServerSettings;
use crate::routes::SynthesisRecord;

/// Emit one event per category heading, generated route, route parameter and ignored object
pub fn emit(records: &[SynthesisRecord], server: &ServerSettings) {
    for category in DatabaseObjectCategory::ALL {
        let category_records: Vec<&SynthesisRecord> = records
            .iter()
            .filter(|record| record.category == category)
            .collect();

        tracing::info!(
            category = category.plural(),
            objects = category_records.len(),
            "generating routes for {}",
            category.plural()
        );

        for record in category_records {
            emit_record(record, server);
        }
    }
}

fn emit_record(record: &SynthesisRecord, server: &ServerSettings) {
    let Some(route) = record.route.as_ref() else {
        tracing::info!(
            category = %record.category,
            name = %record.name,
            admitted = false,
            "route ignored"
        );
        return;
    };

    tracing::info!(
        category = %record.category,
        name = %record.name,
        admitted = true,
        path = %route.path,
        method = %route.method,
        url = %server.public_url(&route.path),
        "route generated"
    );

    for binding in &route.template.bindings {
        if binding.is_aliased() {
            tracing::info!(
                name = %record.name,
                parameter = %binding.source,
                alias = %binding.exposed,
                "parameter"
            );
        } else {
            tracing::info!(name = %record.name, parameter = %binding.source, "parameter");
        }
    }
}
