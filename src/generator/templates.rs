//! API Gateway mapping templates and the model schemas the methods respond
//! with. None of these may contain `${` since Terraform would try to
//! interpolate it.

/// Hands the function the request body, every parameter and the request
/// context.
pub const REQUEST_TEMPLATE: &str = r#"#set($allParams = $input.params())
{
  "body-json" : $input.json('$'),
  "params" : {
    #foreach($type in $allParams.keySet())
    #set($params = $allParams.get($type))
    "$type" : {
      #foreach($paramName in $params.keySet())
      "$paramName" : "$util.escapeJavaScript($params.get($paramName))"
      #if($foreach.hasNext),#end
      #end
    }
    #if($foreach.hasNext),#end
    #end
  },
  "context" : {
    "http-method" : "$context.httpMethod",
    "resource-path" : "$context.resourcePath",
    "request-id" : "$context.requestId",
    "source-ip" : "$context.identity.sourceIp",
    "user-agent" : "$context.identity.userAgent",
    "stage" : "$context.stage"
  }
}
"#;

pub const SUCCESS_RESPONSE_TEMPLATE: &str = r#"#set($inputRoot = $input.path('$'))
{
  "status" : "$inputRoot.status",
  "message" : "$util.escapeJavaScript($inputRoot.message)",
  "request_id" : "$context.requestId"
}
"#;

pub const ERROR_RESPONSE_TEMPLATE: &str = r#"#set($inputRoot = $input.path('$'))
{
  "status" : "error",
  "message" : "$util.escapeJavaScript($inputRoot.errorMessage)",
  "request_id" : "$context.requestId"
}
"#;

/// Matches function errors: messages starting with `Failed`, or mentioning
/// an exception or error anywhere.
pub const ERROR_SELECTION_PATTERN: &str = r"(?is)^(Failed.*|.*(Exception|Error).*)$";

pub const SUCCESS_MODEL_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-04/schema#",
  "title": "Success Message Schema",
  "type": "object",
  "properties": {
    "status": { "type": "string" },
    "message": { "type": "string" },
    "request_id": { "type": "string" }
  },
  "required": ["status", "message", "request_id"]
}"#;

pub const ERROR_MODEL_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-04/schema#",
  "title": "Error Message Schema",
  "type": "object",
  "properties": {
    "status": { "type": "string" },
    "message": { "type": "string" },
    "request_id": { "type": "string" }
  },
  "required": ["status", "message", "request_id"]
}"#;
