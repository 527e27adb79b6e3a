// DLAN Cloudflare Worker API
//
// HTTP endpoints the DLAN dApp calls from the browser: an LLM chat proxy that
// keeps the OpenAI key server-side, an IPFS media proxy that adds CORS, and
// program-address lookups for clients without a Solana SDK.
//
// ── 1. Run locally ────────────────────────────────────────────────────────────
//   wrangler dev
//   # Starts at http://localhost:8787.  Put OPENAI_API_KEY in .dev.vars.
//
// ── 2. Deploy ─────────────────────────────────────────────────────────────────
//   wrangler secret put OPENAI_API_KEY
//   wrangler deploy
//
// ── 3. Test all endpoints ─────────────────────────────────────────────────────
//   export BASE=http://localhost:8787
//
//   curl "$BASE/health"
//
//   curl -X POST "$BASE/api/chat" \
//        -H 'Content-Type: application/json' \
//        -d '{"messages":[{"role":"user","content":"gm"}],"profile":"Handle: alice"}'
//
//   curl -i "$BASE/api/ipfs-proxy?src=https://ipfs.io/ipfs/<CID>"
//
//   curl "$BASE/api/pda?kind=vip&owner=<WALLET>"
//   curl "$BASE/api/pda?kind=post&owner=<AUTHOR>&index=7"
//   curl "$BASE/api/pda?kind=contact&owner=<REQUESTER>&other=<TARGET>"

use serde::{Deserialize, Serialize};
use worker::*;

const VERSION: &str = "0.1.0";
const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
const ATA_PROGRAM_ID:   &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

const DEFAULT_OPENAI_URL:   &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

// ── Entry point ───────────────────────────────────────────────────────────────

#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_log!(
        "{} {} (cf-ray: {})",
        req.method().to_string(),
        req.path(),
        req.headers()
            .get("cf-ray")
            .unwrap_or_default()
            .unwrap_or_default(),
    );

    Router::new()
        .get("/health",                handle_health)
        .on_async("/api/chat",         handle_chat)
        .on_async("/api/gpt-chat",     handle_chat)
        .get_async("/api/ipfs-proxy",  handle_ipfs_proxy)
        .options("/api/ipfs-proxy",    handle_preflight)
        .get("/api/pda",               handle_pda)
        .or_else_any_method("/*path",  handle_not_found)
        .run(req, env)
        .await
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /health  →  liveness payload
fn handle_health(_req: Request, ctx: RouteContext<()>) -> Result<Response> {
    json_ok(&serde_json::json!({
        "status":  "ok",
        "service": "dlan-api",
        "version": VERSION,
        "program": ctx.env.var("DLAN_PROGRAM_ID").map(|v| v.to_string()).ok(),
        "endpoints": {
            "POST /api/chat":       "chat completion  {messages, profile?}",
            "POST /api/gpt-chat":   "alias of /api/chat",
            "GET  /api/ipfs-proxy": "media passthrough with CORS  ?src=URL",
            "GET  /api/pda":        "program address  ?kind=&owner=&other=&index=",
        },
    }))
}

// ── /api/chat ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ChatMessage {
    role:    String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<ChatMessage>,
    /// Free-form profile text, prepended as a system message.
    #[serde(default)]
    profile:  Option<String>,
}

/// POST /api/chat, /api/gpt-chat
/// Body: { "messages": [{ "role": "user", "content": "..." }], "profile": "..." }
/// Response: { "message": { "content": "..." }, "content": "..." }
async fn handle_chat(mut req: Request, ctx: RouteContext<()>) -> Result<Response> {
    if req.method() != Method::Post {
        return json_error(405, "method not allowed; use POST");
    }
    let body: ChatRequest = match req.json().await {
        Ok(v) => v,
        Err(_) => return json_error(400, "invalid JSON body"),
    };
    if body.messages.is_empty() {
        return json_error(400, r#"required field: "messages""#);
    }

    let api_key = match ctx.env.secret("OPENAI_API_KEY") {
        Ok(k) => k.to_string(),
        Err(_) => return json_error(500, "OPENAI_API_KEY is not configured"),
    };
    let url = ctx.env.var("OPENAI_URL")
        .map(|v| v.to_string())
        .unwrap_or_else(|_| DEFAULT_OPENAI_URL.to_string());
    let model = ctx.env.var("OPENAI_MODEL")
        .map(|v| v.to_string())
        .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string());

    let messages = with_profile(body.messages, body.profile.as_deref());
    console_log!("chat model={} messages={}", model, messages.len());

    match complete_chat(&url, &api_key, &model, &messages).await {
        Ok(content) => json_ok(&serde_json::json!({
            "message": { "content": content },
            "content": content,
        })),
        Err(e) => {
            console_log!("chat upstream failed: {}", e);
            json_error(500, &e)
        }
    }
}

/// Prepend the profile as a system message when one is given.
fn with_profile(messages: Vec<ChatMessage>, profile: Option<&str>) -> Vec<ChatMessage> {
    match profile.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => {
            let mut out = Vec::with_capacity(messages.len() + 1);
            out.push(ChatMessage {
                role:    "system".into(),
                content: format!("User profile:\n{p}"),
            });
            out.extend(messages);
            out
        }
        None => messages,
    }
}

async fn complete_chat(
    url:      &str,
    api_key:  &str,
    model:    &str,
    messages: &[ChatMessage],
) -> std::result::Result<String, String> {
    let payload = serde_json::json!({ "model": model, "messages": messages });
    let body = serde_json::to_string(&payload).map_err(|e| e.to_string())?;

    let mut headers = Headers::new();
    headers.set("Content-Type", "application/json").map_err(|e| e.to_string())?;
    headers.set("Authorization", &format!("Bearer {api_key}")).map_err(|e| e.to_string())?;

    let mut init = RequestInit::new();
    init.with_method(Method::Post)
        .with_headers(headers)
        .with_body(Some(body.into()));

    let req = Request::new_with_init(url, &init).map_err(|e| e.to_string())?;
    let mut res = Fetch::Request(req).send().await.map_err(|e| e.to_string())?;
    let status = res.status_code();
    let json: serde_json::Value = res.json().await.map_err(|e| format!("upstream body: {e}"))?;

    if !(200..300).contains(&status) {
        let detail = json["error"]["message"].as_str().unwrap_or("no detail");
        return Err(format!("upstream returned {status}: {detail}"));
    }
    extract_completion(&json)
}

/// `choices[0].message.content` of an OpenAI chat completion.
fn extract_completion(json: &serde_json::Value) -> std::result::Result<String, String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| "upstream: choices[0].message.content missing".to_string())
}

// ── /api/ipfs-proxy ───────────────────────────────────────────────────────────

/// GET /api/ipfs-proxy?src=<url>  →  upstream body, Content-Type preserved
async fn handle_ipfs_proxy(req: Request, _ctx: RouteContext<()>) -> Result<Response> {
    let src = match query_param(&req, "src")? {
        Some(s) if !s.is_empty() => s,
        _ => return cors(json_error(400, "missing ?src=")?),
    };
    let target = match Url::parse(&src) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => u,
        _ => return cors(json_error(400, &format!("invalid src: {src}"))?),
    };

    let mut upstream = match Fetch::Url(target).send().await {
        Ok(r) => r,
        Err(e) => {
            console_log!("ipfs upstream failed: {}", e);
            return cors(json_error(502, "upstream fetch failed")?);
        }
    };
    let status = upstream.status_code();
    if !(200..300).contains(&status) {
        return cors(json_error(502, &format!("upstream returned {status}"))?);
    }

    let content_type = upstream.headers()
        .get("Content-Type")?
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let stream = upstream.stream()?;

    let headers = Headers::new();
    headers.set("Content-Type", &content_type)?;
    headers.set("Cache-Control", "public, max-age=86400")?;
    cors(Response::from_stream(stream)?.with_headers(headers))
}

/// OPTIONS preflight for the media proxy.
fn handle_preflight(_req: Request, _ctx: RouteContext<()>) -> Result<Response> {
    cors(Response::empty()?.with_status(204))
}

fn cors(mut res: Response) -> Result<Response> {
    let h = res.headers_mut();
    h.set("Access-Control-Allow-Origin", "*")?;
    h.set("Access-Control-Allow-Methods", "GET, OPTIONS")?;
    h.set("Access-Control-Allow-Headers", "*")?;
    Ok(res)
}

// ── /api/pda ──────────────────────────────────────────────────────────────────

/// GET /api/pda?kind=<name>&owner=&other=&index=
fn handle_pda(req: Request, ctx: RouteContext<()>) -> Result<Response> {
    let kind = query_param(&req, "kind")?.unwrap_or_default();
    let owner = query_param(&req, "owner")?;
    let other = query_param(&req, "other")?;
    let index = match query_param(&req, "index")? {
        Some(i) => match i.parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => return json_error(400, &format!("index must be an unsigned integer: {i}")),
        },
        None => None,
    };
    let program_id = query_param(&req, "program")?
        .or_else(|| ctx.env.var("DLAN_PROGRAM_ID").ok().map(|v| v.to_string()));

    let lookup = PdaLookup {
        kind:       &kind,
        program_id: program_id.as_deref(),
        owner:      owner.as_deref(),
        other:      other.as_deref(),
        index,
    };
    match lookup.resolve() {
        Ok((address, bump)) => json_ok(&serde_json::json!({
            "kind":    kind,
            "address": address,
            "bump":    bump,
        })),
        Err(e) => json_error(400, &e),
    }
}

/// Catch-all for unknown routes
fn handle_not_found(req: Request, _ctx: RouteContext<()>) -> Result<Response> {
    console_log!("404 {}", req.path());
    json_error(404, &format!("route not found: {}", req.path()))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn query_param(req: &Request, name: &str) -> Result<Option<String>> {
    Ok(req.url()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned()))
}

/// Return a 200 JSON response.
fn json_ok(body: &serde_json::Value) -> Result<Response> {
    let mut res = Response::from_json(body)?;
    res.headers_mut()
        .set("Content-Type", "application/json")?;
    Ok(res)
}

/// Return an error JSON response with the given HTTP status.
fn json_error(status: u16, message: &str) -> Result<Response> {
    let body = serde_json::json!({ "error": message });
    let res = Response::from_json(&body)?
        .with_status(status);
    Ok(res)
}

// ── PDA derivation ────────────────────────────────────────────────────────────
//
// Same seeds as dlan_sdk::pda, computed with sha2 + curve25519-dalek because
// solana-sdk does not build for wasm32-unknown-unknown.
//
//   pool            ["pool"]
//   treasury        ["treasury"]
//   mint_authority  ["mint_authority", pool]
//   user            ["user", owner]
//   vip             ["vip", owner]
//   profile         ["profile", owner]
//   post            ["post", author, index as u64 LE]
//   contact         ["contact", requester, target]
//   social_config   ["social_config"]
//   ata             [wallet, token_program, mint]  (program = ATA program)

const MAX_SEED_LEN: usize = 32;

struct PdaLookup<'a> {
    kind:       &'a str,
    program_id: Option<&'a str>,
    owner:      Option<&'a str>,
    other:      Option<&'a str>,
    index:      Option<u64>,
}

impl PdaLookup<'_> {
    fn resolve(&self) -> std::result::Result<(String, u8), String> {
        if self.kind == "ata" {
            let wallet = decode_key(self.owner, "owner")?;
            let mint = decode_key(self.other, "other (mint)")?;
            let token_program = decode_key(Some(TOKEN_PROGRAM_ID), "token program")?;
            return find_pda(&[&wallet, &token_program, &mint], ATA_PROGRAM_ID);
        }

        let program = self.program_id
            .ok_or_else(|| "no program: pass ?program= or set DLAN_PROGRAM_ID".to_string())?;
        match self.kind {
            "pool"          => find_pda(&[b"pool"], program),
            "treasury"      => find_pda(&[b"treasury"], program),
            "social_config" => find_pda(&[b"social_config"], program),
            "mint_authority" => {
                let (pool, _) = find_pda(&[b"pool"], program)?;
                let pool = decode_key(Some(&pool), "pool")?;
                find_pda(&[b"mint_authority", &pool], program)
            }
            "user" | "vip" | "profile" => {
                let owner = decode_key(self.owner, "owner")?;
                find_pda(&[self.kind.as_bytes(), &owner], program)
            }
            "post" => {
                let author = decode_key(self.owner, "owner")?;
                let index = self.index.ok_or_else(|| "missing ?index=".to_string())?;
                find_pda(&[b"post", &author, &index.to_le_bytes()], program)
            }
            "contact" => {
                let a = decode_key(self.owner, "owner")?;
                let b = decode_key(self.other, "other")?;
                find_pda(&[b"contact", &a, &b], program)
            }
            other => Err(format!(
                "unknown kind '{other}'; expected pool, treasury, mint_authority, user, vip, \
                 profile, post, contact, social_config or ata"
            )),
        }
    }
}

fn decode_key(value: Option<&str>, what: &str) -> std::result::Result<Vec<u8>, String> {
    let s = value.ok_or_else(|| format!("missing {what}"))?;
    let bytes = bs58::decode(s).into_vec().map_err(|_| format!("invalid {what}: {s}"))?;
    if bytes.len() != 32 {
        return Err(format!("{what} must be 32 bytes, got {}", bytes.len()));
    }
    Ok(bytes)
}

/// Generic find_program_address: SHA-256(seeds... ‖ [nonce] ‖ program_id ‖ "ProgramDerivedAddress")
/// Tries nonces 255 → 0, returns the first candidate NOT on the Ed25519 curve.
fn find_pda(
    seeds:          &[&[u8]],
    program_id_b58: &str,
) -> std::result::Result<(String, u8), String> {
    if let Some(s) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(format!("seed of {} bytes exceeds {MAX_SEED_LEN}", s.len()));
    }
    let program_id = decode_key(Some(program_id_b58), "program")?;

    for nonce in (0u8..=255).rev() {
        let nonce_buf = [nonce];
        let mut inputs: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 3);
        inputs.extend_from_slice(seeds);
        inputs.push(&nonce_buf);
        inputs.push(&program_id);
        inputs.push(b"ProgramDerivedAddress");

        let candidate = pda_hash(&inputs);
        if !is_on_ed25519_curve(&candidate) {
            return Ok((bs58::encode(candidate).into_string(), nonce));
        }
    }
    Err("could not find a valid PDA nonce (exhausted 0–255)".into())
}

/// SHA-256 over the concatenation of all input slices.
fn pda_hash(inputs: &[&[u8]]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut h = Sha256::new();
    for input in inputs {
        h.update(input);
    }
    h.finalize().into()
}

/// Valid PDAs must NOT be on the curve.
fn is_on_ed25519_curve(bytes: &[u8; 32]) -> bool {
    use curve25519_dalek::edwards::CompressedEdwardsY;
    CompressedEdwardsY(*bytes).decompress().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "11111111111111111111111111111111";
    const WALLET:  &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const TARGET:  &str = "So11111111111111111111111111111111111111112";

    fn lookup<'a>(kind: &'a str, owner: Option<&'a str>, other: Option<&'a str>, index: Option<u64>) -> PdaLookup<'a> {
        PdaLookup { kind, program_id: Some(PROGRAM), owner, other, index }
    }

    #[test]
    fn derivation_is_deterministic_and_off_curve() {
        let a = lookup("vip", Some(WALLET), None, None).resolve().unwrap();
        let b = lookup("vip", Some(WALLET), None, None).resolve().unwrap();
        assert_eq!(a, b);

        let bytes: [u8; 32] = bs58::decode(&a.0).into_vec().unwrap().try_into().unwrap();
        assert!(!is_on_ed25519_curve(&bytes));
    }

    #[test]
    fn kinds_do_not_collide() {
        let user = lookup("user", Some(WALLET), None, None).resolve().unwrap();
        let vip = lookup("vip", Some(WALLET), None, None).resolve().unwrap();
        let profile = lookup("profile", Some(WALLET), None, None).resolve().unwrap();
        assert_ne!(user.0, vip.0);
        assert_ne!(vip.0, profile.0);
    }

    #[test]
    fn contact_order_and_post_index_matter() {
        let ab = lookup("contact", Some(WALLET), Some(TARGET), None).resolve().unwrap();
        let ba = lookup("contact", Some(TARGET), Some(WALLET), None).resolve().unwrap();
        assert_ne!(ab.0, ba.0);

        let p7 = lookup("post", Some(WALLET), None, Some(7)).resolve().unwrap();
        let p8 = lookup("post", Some(WALLET), None, Some(8)).resolve().unwrap();
        assert_ne!(p7.0, p8.0);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(lookup("vip", None, None, None).resolve().is_err());
        assert!(lookup("vip", Some("not-base58!"), None, None).resolve().is_err());
        assert!(lookup("post", Some(WALLET), None, None).resolve().is_err());
        assert!(lookup("nope", None, None, None).resolve().is_err());
        let no_program = PdaLookup { kind: "pool", program_id: None, owner: None, other: None, index: None };
        assert!(no_program.resolve().is_err());
        assert!(find_pda(&[&[0u8; 33]], PROGRAM).is_err());
    }

    #[test]
    fn profile_becomes_leading_system_message() {
        let msgs = vec![ChatMessage { role: "user".into(), content: "gm".into() }];
        let out = with_profile(msgs.clone(), Some("  Handle: alice "));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, "system");
        assert!(out[0].content.ends_with("Handle: alice"));
        assert_eq!(out[1], msgs[0]);

        assert_eq!(with_profile(msgs.clone(), Some("   ")), msgs);
        assert_eq!(with_profile(msgs.clone(), None), msgs);
    }

    #[test]
    fn completion_content_is_extracted() {
        let ok = serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": "hi" } }] });
        assert_eq!(extract_completion(&ok).unwrap(), "hi");
        assert!(extract_completion(&serde_json::json!({ "choices": [] })).is_err());
    }
}
