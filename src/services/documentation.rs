use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Wavelength Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::game_stream,
        crate::routes::games::create_game,
        crate::routes::games::join_game,
        crate::routes::games::start_game,
        crate::routes::games::submit_guess,
        crate::routes::games::auto_submit_guesses,
        crate::routes::games::switch_describer,
        crate::routes::games::end_round,
        crate::routes::games::continue_to_next_round,
        crate::routes::games::mark_ready,
        crate::routes::games::update_player_status,
        crate::routes::public::get_game,
        crate::routes::public::get_game_by_room_code,
        crate::routes::public::get_players,
        crate::routes::public::get_current_guesses,
        crate::routes::public::get_player_current_guess,
        crate::routes::public::get_round_results,
        crate::routes::public::get_round_result,
        crate::routes::public::get_scores,
        crate::routes::public::get_game_stats,
        crate::routes::public::get_recent_events,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::sse::SystemStatus,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::HostActionRequest,
            crate::dto::game::PlayerActionRequest,
            crate::dto::game::SubmitGuessRequest,
            crate::dto::game::PlayerStatusRequest,
            crate::dto::game::GameSummary,
            crate::dto::game::PlayerSummary,
            crate::dto::game::GameStatsResponse,
            crate::state::state_machine::GamePhase,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "game", description = "Round lifecycle operations"),
        (name = "public", description = "Read-only game projections"),
    )
)]
pub struct ApiDoc;
