// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Locale Detection and Message Catalog
//!
//! Every error produced by the auth layer selects a message *key*; the text
//! shown to the caller is looked up here for the request's locale.
//!
//! ## Detection Order
//!
//! 1. `X-Language` header (explicit override)
//! 2. First tag of `Accept-Language` (q-values ignored)
//! 3. English
//!
//! Region suffixes are dropped (`en-US` → `en`) and anything unsupported
//! falls back to English.

use axum::http::HeaderMap;
use serde::Serialize;
use utoipa::ToSchema;

/// Explicit language override header.
pub const LANGUAGE_HEADER: &str = "x-language";

/// Supported response languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    /// Detect the locale from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if let Some(lang) = header_str(headers, LANGUAGE_HEADER) {
            return Self::normalize(lang);
        }

        if let Some(accept) = header_str(headers, "accept-language") {
            if let Some(first) = first_language_tag(accept) {
                return Self::normalize(first);
            }
        }

        Locale::En
    }

    /// Map a raw language tag or name to a supported locale.
    pub fn normalize(raw: &str) -> Self {
        let lang = raw.trim().to_lowercase();
        let primary = lang.split('-').next().unwrap_or_default();

        match primary {
            "ar" | "arabic" => Locale::Ar,
            _ => Locale::En,
        }
    }

    /// Two-letter code for this locale.
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn first_language_tag(accept: &str) -> Option<&str> {
    let first = accept.split(',').next()?.trim();
    let tag = first.split(';').next().unwrap_or(first).trim();
    (!tag.is_empty()).then_some(tag)
}

/// Translate a message key. Unknown keys are returned unchanged.
pub fn translate(key: &'static str, locale: Locale) -> &'static str {
    match locale {
        Locale::En => english(key),
        Locale::Ar => arabic(key).unwrap_or_else(|| english(key)),
    }
}

fn english(key: &'static str) -> &'static str {
    match key {
        "missing_authentication" => "Authentication is required",
        "invalid_service_credentials" => "Invalid service credentials",
        "missing_service_headers" => "Service authentication headers are missing",
        "invalid_authorization_format" => {
            "Invalid authorization header format (expected 'Bearer <token>')"
        }
        "missing_authorization_header" => "Authorization header is required",
        "jwt_secret_not_configured" => "Token validation is not configured",
        "invalid_or_expired_token" => "Invalid or expired token",
        "authentication_required" => "Authentication required",
        "user_id_not_found" => "User ID not found in request",
        "insufficient_permissions" => "Insufficient permissions",
        "failed_to_validate_permissions" => "Failed to validate permissions",
        "rate_limit_exceeded" => "Rate limit exceeded",
        "invalid_api_key" => "Invalid or missing API key",
        "ip_not_trusted" => "Access denied: IP not in trusted list",
        "request_too_large" => "Request too large",
        "unsupported_content_type" => "Content-Type must be application/json",
        "internal_error" => "Internal server error",
        other => other,
    }
}

fn arabic(key: &str) -> Option<&'static str> {
    let text = match key {
        "missing_authentication" => "المصادقة مطلوبة",
        "invalid_service_credentials" => "بيانات اعتماد الخدمة غير صالحة",
        "missing_service_headers" => "ترويسات مصادقة الخدمة مفقودة",
        "invalid_authorization_format" => "تنسيق ترويسة التفويض غير صالح",
        "missing_authorization_header" => "ترويسة التفويض مطلوبة",
        "jwt_secret_not_configured" => "التحقق من الرمز غير مهيأ",
        "invalid_or_expired_token" => "الرمز غير صالح أو منتهي الصلاحية",
        "authentication_required" => "المصادقة مطلوبة",
        "user_id_not_found" => "معرف المستخدم غير موجود في الطلب",
        "insufficient_permissions" => "صلاحيات غير كافية",
        "failed_to_validate_permissions" => "فشل التحقق من الصلاحيات",
        "rate_limit_exceeded" => "تم تجاوز حد الطلبات",
        "invalid_api_key" => "مفتاح API غير صالح أو مفقود",
        "ip_not_trusted" => "تم رفض الوصول: عنوان IP غير موثوق",
        "request_too_large" => "الطلب كبير جداً",
        "unsupported_content_type" => "يجب أن يكون نوع المحتوى application/json",
        "internal_error" => "خطأ داخلي في الخادم",
        _ => return None,
    };
    Some(text)
}
