use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::job::handler::transcode,
    ),
    components(
        schemas(
            crate::modules::job::dto::TranscodeRequest,
            crate::modules::job::dto::SourceLocator,
            crate::modules::job::dto::TranscodeResponse,
            crate::modules::job::model::JobRecord,
            crate::common::response::ErrorResponse,
        )
    ),
    tags(
        (name = "Transcode", description = "Media conversion pipeline")
    )
)]
pub struct ApiDoc;
