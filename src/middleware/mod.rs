/*
 * Responsibility
 * - middleware の公開インターフェース
 * - gate (アクセス制御), cors, http (request-id/trace/limit/timeout), security_headers
 */
pub mod cors;
pub mod gate;
pub mod http;
pub mod security_headers;
