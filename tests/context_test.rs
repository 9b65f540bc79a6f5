//! End-to-end tests of the parse pipeline: MessageML in, all renditions out,
//! plus the PresentationML and legacy markdown input paths.

use serde_json::{Value, json};

use messageml::{
    DataProvider, ElementKind, Result, UserPresentation, parse_markdown, parse_message_ml,
};

struct TestProvider;

impl DataProvider for TestProvider {
    fn user_presentation(&self, user_id: i64) -> Result<UserPresentation> {
        Ok(UserPresentation::new(
            user_id,
            "bot.user1",
            "Bot User01",
            "bot.user1@localhost.com",
        ))
    }
}

fn parse(message: &str, entity_json: Option<&str>) -> Result<messageml::Message> {
    parse_message_ml(message, entity_json, "2.0", &TestProvider)
}

// ============================================================================
// MessageML input
// ============================================================================

#[test]
fn test_parse_message_unescape_chars() {
    let mml = "<messageML>&lt;b&gt;Hello&lt;/b&gt; &lt;i&gt;world!&lt;/i&gt;</messageML>";
    let pml = "<div data-format=\"PresentationML\" data-version=\"2.0\">\
               &lt;b&gt;Hello&lt;/b&gt; &lt;i&gt;world!&lt;/i&gt;</div>";
    let md = "<b>Hello</b> <i>world!</i>";

    let message = parse(mml, None).expect("Failed to parse MessageML");
    assert_eq!(message.presentation_ml(), pml);
    assert_eq!(message.markdown(), md);

    // PresentationML reparses to the same outputs.
    let message = parse(pml, None).expect("Failed to parse PresentationML");
    assert_eq!(message.presentation_ml(), pml);
    assert_eq!(message.markdown(), md);

    // So does the markdown rendition.
    let message = parse_markdown(md, None, None, &TestProvider).expect("Failed to parse markdown");
    assert_eq!(message.presentation_ml(), pml);
    assert_eq!(message.markdown(), md);
}

#[test]
fn test_escape_reserved_chars() {
    let content = "½ ¼ ¾ [ ] \\ ; ' , . / ~ ! @ # $ % - = ^ &amp; * ( ) _ + { } | : \" \
                   &lt; &gt; ? <i>italic</i> <b>bold</b> <hash tag=\"hashtag\"/>";
    let expected_pml = "<div data-format=\"PresentationML\" data-version=\"2.0\">\
                        ½ ¼ ¾ [ ] \\ ; ' , . / ~ ! @ # $ % - = ^ &amp; * ( ) _ + { } | : &quot; \
                        &lt; &gt; ? <i>italic</i> <b>bold</b> \
                        <span class=\"entity\" data-entity-id=\"keyword1\">#hashtag</span></div>";
    let expected_md = "½ ¼ ¾ [ ] \\ ; ' , . / ~ ! @ # $ % \\- = ^ & \\* ( ) \\_ \\+ { } | : \" \
                       < > ? _italic_ **bold** #hashtag";
    let expected_entities = json!({
        "hashtags": [{
            "id": "#hashtag",
            "text": "#hashtag",
            "indexStart": 90,
            "indexEnd": 98,
            "type": "KEYWORD",
        }]
    });

    let message = parse(&format!("<messageML>{content}</messageML>"), None)
        .expect("Failed to parse MessageML");
    assert_eq!(message.presentation_ml(), expected_pml);
    assert_eq!(message.markdown(), expected_md);
    assert_eq!(message.entities(), &expected_entities);
}

#[test]
fn test_get_text_whitespace_logic() {
    let message = "<messageML><span>\nfoo</span>bar<span>\n</span> baz<span>qux\n</span></messageML>";
    let message = parse(message, None).expect("Failed to parse MessageML");

    assert_eq!(message.as_text(), " foobar  bazqux ");
    assert_eq!(message.text(true), " foo bar    baz qux ");
    assert_eq!(message.text(false), "foo bar baz qux");
}

#[test]
fn test_chime() {
    let message = parse("<messageML><chime/></messageML>", None).expect("Failed to parse chime");
    assert!(message.is_chime());
    assert_eq!(
        message.presentation_ml(),
        "<div data-format=\"PresentationML\" data-version=\"2.0\">\
         <audio src=\"https://asset.symphony.com/symphony/audio/chime.mp3\" \
         autoplay=\"true\"/></div>"
    );

    let err = parse("<messageML><chime/><p>Hello</p></messageML>", None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Chime messages may not have any other content"
    );
}

#[test]
fn test_presentation_render_is_fixpoint() {
    let mml = "<messageML><h2>Report</h2><p>Totals: <b>12</b>, <i>3 open</i></p>\
               <ul><li>alpha</li><li>beta</li></ul>\
               <hash tag=\"release\"/> <cash tag=\"ibm\"/> <mention uid=\"123456789\"/>\
               <a href=\"https://example.com\"/></messageML>";
    let first = parse(mml, None).expect("Failed to parse MessageML");
    let reparsed = parse(
        first.presentation_ml(),
        Some(&first.entity_json().to_string()),
    )
    .expect("Failed to reparse PresentationML");

    assert_eq!(reparsed.presentation_ml(), first.presentation_ml());
    assert_eq!(reparsed.markdown(), first.markdown());
    assert_eq!(reparsed.entity_json(), first.entity_json());
}

#[test]
fn test_find_elements() {
    let mml = "<messageML><div class=\"label\"><span class=\"label\">one</span></div>\
               <span>two</span></messageML>";
    let message = parse(mml, None).expect("Failed to parse MessageML");
    let doc = message.document();

    assert_eq!(doc.find_elements_by_tag("span").len(), 2);
    assert_eq!(doc.find_elements_by_attribute("class", "label").len(), 2);
    let divs = doc.find_elements_by_tag("div");
    assert_eq!(divs.len(), 1);
    assert_eq!(doc.subtree_text(divs[0]), "one");
}

// ============================================================================
// Entity stores
// ============================================================================

#[test]
fn test_unrecognized_entity_keeps_markup() {
    let mml = "<messageML><div class=\"entity\" data-entity-id=\"obj123\">Custom</div></messageML>";
    let store = "{\"obj123\": {\"type\": \"custom.entity\", \"version\": \"1.0\"}}";
    let message = parse(mml, Some(store)).expect("Failed to parse MessageML");

    assert_eq!(
        message.presentation_ml(),
        "<div data-format=\"PresentationML\" data-version=\"2.0\">\
         <div class=\"entity\" data-entity-id=\"obj123\">Custom</div></div>"
    );
    assert_eq!(message.entity_json()["obj123"]["type"], "custom.entity");
}

#[test]
fn test_resolved_entity_replaces_markup() {
    let pml = "<div data-format=\"PresentationML\" data-version=\"2.0\">\
               <span class=\"entity\" data-entity-id=\"hash123\">#stale text</span></div>";
    let store = json!({
        "hash123": {
            "type": "org.symphonyoss.taxonomy",
            "version": "1.0",
            "id": [{ "type": "org.symphonyoss.taxonomy.hashtag", "value": "world" }],
        }
    })
    .to_string();
    let message = parse(pml, Some(&store)).expect("Failed to parse PresentationML");

    let tags = message.document().find_elements_by_tag("hash");
    assert_eq!(tags.len(), 1);
    assert_eq!(
        message.document().node(tags[0]).kind,
        ElementKind::HashTag {
            value: "world".to_string(),
            entity_id: "hash123".to_string(),
        }
    );
    // The marker text regenerates from the resolved value.
    assert_eq!(message.markdown(), "#world");
}

#[test]
fn test_fail_on_mismatched_entities() {
    let mml = "<messageML><div class=\"entity\" data-entity-id=\"obj123\">This will fail</div>\
               </messageML>";
    let err = parse(mml, Some("{\"obj456\": \"Won't match\"}")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error processing EntityJSON: no entity data provided for \"data-entity-id\"=\"obj123\""
    );
}

#[test]
fn test_fail_on_duplicate_entity_id() {
    let mml = "<messageML><div class=\"entity\" data-entity-id=\"obj123\">Dup</div></messageML>";
    let store = "{\"obj123\": {\"type\": \"a\"}, \"nested\": {\"obj123\": {\"type\": \"b\"}}}";
    let err = parse(mml, Some(store)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Duplicate \"data-entity-id\"=\"obj123\" in entityJSON"
    );
}

#[test]
fn test_fail_on_invalid_entity_json() {
    let err = parse("<messageML>MessageML</messageML>", Some("{invalid: json}")).unwrap_err();
    assert!(
        err.to_string().starts_with("Error parsing EntityJSON: "),
        "unexpected message: {err}"
    );
}

#[test]
fn test_fail_on_non_object_entity_node() {
    let mml = "<messageML><div class=\"entity\" data-entity-id=\"obj123\">x</div></messageML>";
    let err = parse(mml, Some("{\"obj123\": \"not an object\"}")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error processing EntityJSON: the node \"obj123\" has to be an object"
    );
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_fail_on_invalid_root_tag() {
    let err = parse("<message></message>", None).unwrap_err();
    assert_eq!(err.to_string(), "Root tag must be <messageML> or <div>");
}

#[test]
fn test_fail_on_blank_message() {
    for message in ["", "   ", "\n\t"] {
        let err = parse(message, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error parsing message: the message cannot be null or empty"
        );
    }
}

#[test]
fn test_fail_on_control_characters() {
    let err = parse("<messageML>Hello\u{0008}world!</messageML>", None).unwrap_err();
    assert_eq!(err.to_string(), "Invalid control characters in message");
}

#[test]
fn test_fail_on_invalid_tag() {
    let err = parse("<messageML><script>Test</script></messageML>", None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid MessageML content at element \"script\""
    );
}

#[test]
fn test_fail_on_mismatched_tags() {
    let err = parse(
        "<messageML><div class=\"invalid\">Test</span></messageML>",
        None,
    )
    .unwrap_err();
    assert!(
        err.to_string().starts_with("Invalid messageML: "),
        "unexpected message: {err}"
    );
}

#[test]
fn test_fail_on_shorthand_in_presentation_ml() {
    let pml = "<div data-format=\"PresentationML\" data-version=\"2.0\">\
               <hash tag=\"x\"/></div>";
    let err = parse(pml, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Shorthand tag \"hash\" is not allowed in PresentationML"
    );
}

// ============================================================================
// Legacy markdown input
// ============================================================================

#[test]
fn test_parse_empty_markdown() {
    let message =
        parse_markdown("", Some(&json!({})), None, &TestProvider).expect("Failed to parse");
    assert!(message.document().children(message.document().root()).is_empty());
    assert_eq!(message.markdown(), "");
}

#[test]
fn test_parse_markdown_full_payload() {
    let text = "Hello!\nTable:\n---\nA1 | B1\nA2 | B2\n---\n\
                **bold** _italic_ #hashtag $cashtag @Bot User01 http://example.com\n\
                - list\n- item\nTable:\n---\nX1 | Y1\nX2 | Y2\n---\n";
    let entities = json!({
        "hashtags": [
            { "id": "#hashtag", "text": "#hashtag", "indexStart": 56, "indexEnd": 64,
              "type": "KEYWORD" },
            { "id": "$cashtag", "text": "$cashtag", "indexStart": 65, "indexEnd": 73,
              "type": "KEYWORD" },
        ],
        "userMentions": [
            { "id": 123456789, "text": "@Bot User01", "indexStart": 74, "indexEnd": 85,
              "type": "USER_FOLLOW" },
        ],
        "urls": [
            { "id": "http://example.com", "text": "http://example.com",
              "expandedUrl": "http://example.com", "indexStart": 86, "indexEnd": 104,
              "type": "URL" },
        ],
    });

    let message =
        parse_markdown(text, Some(&entities), None, &TestProvider).expect("Failed to parse");

    // The emitted markdown reproduces the input exactly.
    assert_eq!(message.markdown(), text);

    assert_eq!(
        message.presentation_ml(),
        "<div data-format=\"PresentationML\" data-version=\"2.0\">Hello!\
         <table><tr><td>A1</td><td>B1</td></tr><tr><td>A2</td><td>B2</td></tr></table>\
         <b>bold</b> <i>italic</i> \
         <span class=\"entity\" data-entity-id=\"keyword1\">#hashtag</span> \
         <span class=\"entity\" data-entity-id=\"keyword2\">$cashtag</span> \
         <span class=\"entity\" data-entity-id=\"mention3\">@Bot User01</span> \
         <a href=\"http://example.com\">http://example.com</a>\
         <ul><li>list</li><li>item</li></ul>\
         <table><tr><td>X1</td><td>Y1</td></tr><tr><td>X2</td><td>Y2</td></tr></table></div>"
    );

    let expected_entities = json!({
        "hashtags": [
            { "id": "#hashtag", "text": "#hashtag", "indexStart": 56, "indexEnd": 64,
              "type": "KEYWORD" },
            { "id": "$cashtag", "text": "$cashtag", "indexStart": 65, "indexEnd": 73,
              "type": "KEYWORD" },
        ],
        "userMentions": [
            { "id": 123456789, "screenName": "bot.user1", "prettyName": "Bot User01",
              "text": "@Bot User01", "indexStart": 74, "indexEnd": 85,
              "userType": "lc", "type": "USER_FOLLOW" },
        ],
        "urls": [
            { "text": "http://example.com", "id": "http://example.com",
              "expandedUrl": "http://example.com", "indexStart": 86, "indexEnd": 104,
              "type": "URL" },
        ],
    });
    assert_eq!(message.entities(), &expected_entities);

    let expected_entity_json = json!({
        "keyword1": {
            "type": "org.symphonyoss.taxonomy",
            "version": "1.0",
            "id": [{ "type": "org.symphonyoss.taxonomy.hashtag", "value": "hashtag" }],
        },
        "keyword2": {
            "type": "org.symphonyoss.fin.security",
            "version": "1.0",
            "id": [{ "type": "org.symphonyoss.fin.security.id.ticker", "value": "cashtag" }],
        },
        "mention3": {
            "type": "com.symphony.user.mention",
            "version": "1.0",
            "id": [{ "type": "com.symphony.user.userId", "value": "123456789" }],
        },
    });
    assert_eq!(message.entity_json(), &expected_entity_json);
}

#[test]
fn test_parse_markdown_with_html_tag() {
    let md = "<div class=\"foo\">*Markdown*</div> *Markdown* <hr/>";
    let message = parse_markdown(md, Some(&json!({})), None, &TestProvider)
        .expect("Failed to parse markdown");

    assert_eq!(
        message.presentation_ml(),
        "<div data-format=\"PresentationML\" data-version=\"2.0\">\
         &lt;div class=&quot;foo&quot;&gt;<i>Markdown</i>&lt;/div&gt; <i>Markdown</i> \
         &lt;hr/&gt;</div>"
    );
    assert_eq!(
        message.markdown(),
        "<div class=\"foo\">_Markdown_</div> _Markdown_ <hr/>"
    );
}

#[test]
fn test_parse_markdown_with_nbsp() {
    let message = parse_markdown("Hello\u{A0}world!", None, None, &TestProvider)
        .expect("Failed to parse markdown");
    assert_eq!(
        message.presentation_ml(),
        "<div data-format=\"PresentationML\" data-version=\"2.0\">Hello world!</div>"
    );
    assert_eq!(message.markdown(), "Hello world!");
}

#[test]
fn test_parse_markdown_standalone_hash() {
    let message =
        parse_markdown("# test", None, None, &TestProvider).expect("Failed to parse markdown");
    assert_eq!(message.as_text(), "# test");
    assert_eq!(message.markdown(), "# test");
    assert_eq!(
        message.presentation_ml(),
        "<div data-format=\"PresentationML\" data-version=\"2.0\"># test</div>"
    );
}

#[test]
fn test_parse_markdown_invalid_indices() {
    let entities = json!({
        "hashtags": [
            { "id": "#world", "indexStart": 0, "indexEnd": 0, "type": "KEYWORD" },
        ]
    });
    let err = parse_markdown("Hello #world", Some(&entities), None, &TestProvider).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid entity payload: #world (start index: 0, end index: 0)"
    );
}

#[test]
fn test_parse_markdown_media_carried_through() {
    let media = json!([{ "type": "image", "id": 42 }]);
    let message = parse_markdown("Hello", None, Some(&media), &TestProvider)
        .expect("Failed to parse markdown");
    assert_eq!(message.media(), &media);

    let message = parse_markdown("Hello", None, None, &TestProvider).expect("Failed to parse");
    assert_eq!(message.media(), &Value::Null);
}
