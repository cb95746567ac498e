/// Infrastructure graph conventions, shared by the AI generation prompt and the MCP server instructions.
pub const CONVENTIONS: &str = "\
1. One node per real resource. Each node has an `id` (\"node-N\"), a `type`, a short `label`, \
a `properties` object and a `position` {x, y}. Positions may be omitted; unpositioned graphs are \
auto-laid out.\n\
2. Resource types are a closed set: vpc, subnet, ec2, rds, alb, s3, lambda, security_group, \
iam_role, internet_gateway, nat_gateway, cloudfront, api_gateway, dynamodb, sqs, sns, elasticache. \
Do not invent other types.\n\
3. Layers run top to bottom: internet_gateway, cloudfront and vpc (0); alb and api_gateway (1); \
subnet and nat_gateway (2); ec2 and lambda (3); security_group, rds, dynamodb and elasticache (4); \
s3, sqs and sns (5); iam_role (6).\n\
4. Edges are directed and carry a `type`: \"containment\" (vpc → subnet, vpc → gateway), \
\"connection\" (alb → ec2 \"routes to\", security_group → ec2/rds \"protects\", api_gateway → \
lambda \"invokes\") or \"dependency\" (ec2 → rds \"queries\", lambda → dynamodb \"reads/writes\"). \
Edge ids follow `edge-{source}-{target}`. Never connect a node to itself and never reference a \
node id that is not in `nodes`.\n\
5. A subnet always lives inside a vpc. If compute (ec2, lambda) or databases (rds) exist, include \
a security_group that protects them.\n\
6. Security-relevant properties are read by the scanner and must use these exact keys: \
`encrypted` (rds, s3, dynamodb, elasticache), `ebsEncrypted` (ec2), `publiclyAccessible` (rds), \
`multiAz` (rds), `publicAccess` (s3), `flowLogsEnabled` (vpc), `isPublic` (subnet), `cidr` (vpc, \
subnet), `instanceType` (ec2), `ingressRules` (security_group: array of {protocol, port, cidr}; \
port 0 or -1 means all ports).\n\
7. Model for production: encrypt data stores, enable flow logs, keep databases private and \
multi-AZ, give every lambda an iam_role, and put a nat_gateway in front of private subnets.\n\
\n\
## Graph JSON\n\
{\"nodes\": [{\"id\": \"node-1\", \"type\": \"vpc\", \"label\": \"VPC\", \"properties\": {\"cidr\": \"10.0.0.0/16\", \
\"flowLogsEnabled\": true}}, {\"id\": \"node-2\", \"type\": \"subnet\", \"label\": \"Private Subnet\", \
\"properties\": {\"cidr\": \"10.0.1.0/24\", \"isPublic\": false}}], \"edges\": [{\"id\": \"edge-node-1-node-2\", \
\"source\": \"node-1\", \"target\": \"node-2\", \"label\": \"contains\", \"type\": \"containment\"}], \
\"metadata\": {\"name\": \"My Stack\", \"region\": \"us-east-1\"}}";
