/*
 * Responsibility
 * - アプリのドメインロジック (gate 判定, identity provider, mail 送信)
 * - axum の Router/middleware からは trait 越しに呼び出す
 */
pub mod gate;
pub mod identity;
pub mod mail;
