//! Icon search index.
//!
//! The built-in catalog covers the terrastruct icon library entries the agent
//! reaches for most often. Search is a case-insensitive substring match on the
//! icon name, stable order, first-match-wins — an empty result is an answer,
//! never an error.

use async_trait::async_trait;

/// One icon the model can reference from diagram source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconEntry {
    pub name: String,
    pub url: String,
}

/// Icon search collaborator contract.
#[async_trait]
pub trait IconIndex: Send + Sync {
    /// Case-insensitive substring match on name, at most `max_results`
    /// entries in catalog order. Returns an empty list on no match.
    async fn search(&self, query: &str, max_results: usize) -> Vec<IconEntry>;
}

/// Static in-process catalog.
pub struct BuiltinIconIndex;

const ICON_BASE: &str = "https://icons.terrastruct.com";

/// (name, catalog path) pairs. Order is significant: search returns the first
/// matches in this order.
const CATALOG: &[(&str, &str)] = &[
    ("Amazon S3", "aws%2FStorage%2FAmazon-Simple-Storage-Service-S3.svg"),
    ("Amazon S3 Glacier", "aws%2FStorage%2FAmazon-S3-Glacier.svg"),
    ("Amazon EC2", "aws%2FCompute%2FAmazon-EC2.svg"),
    ("AWS Lambda", "aws%2FCompute%2FAWS-Lambda.svg"),
    ("Amazon ECS", "aws%2FCompute%2FAmazon-Elastic-Container-Service.svg"),
    ("Amazon EKS", "aws%2FCompute%2FAmazon-Elastic-Kubernetes-Service.svg"),
    ("Amazon DynamoDB", "aws%2FDatabase%2FAmazon-DynamoDB.svg"),
    ("Amazon RDS", "aws%2FDatabase%2FAmazon-RDS.svg"),
    ("Amazon Aurora", "aws%2FDatabase%2FAmazon-Aurora.svg"),
    ("Amazon ElastiCache", "aws%2FDatabase%2FAmazon-ElastiCache.svg"),
    ("Amazon Redshift", "aws%2FDatabase%2FAmazon-Redshift.svg"),
    ("Amazon API Gateway", "aws%2FNetworking-Content-Delivery%2FAmazon-API-Gateway.svg"),
    ("Amazon CloudFront", "aws%2FNetworking-Content-Delivery%2FAmazon-CloudFront.svg"),
    ("Amazon Route 53", "aws%2FNetworking-Content-Delivery%2FAmazon-Route-53.svg"),
    ("Amazon VPC", "aws%2FNetworking-Content-Delivery%2FAmazon-Virtual-Private-Cloud.svg"),
    ("Elastic Load Balancing", "aws%2FNetworking-Content-Delivery%2FElastic-Load-Balancing.svg"),
    ("Amazon SQS", "aws%2FApplication-Integration%2FAmazon-Simple-Queue-Service-SQS.svg"),
    ("Amazon SNS", "aws%2FApplication-Integration%2FAmazon-Simple-Notification-Service-SNS.svg"),
    ("Amazon Kinesis", "aws%2FAnalytics%2FAmazon-Kinesis.svg"),
    ("Amazon CloudWatch", "aws%2FManagement-Governance%2FAmazon-CloudWatch.svg"),
    ("AWS IAM", "aws%2FSecurity-Identity-Compliance%2FAWS-Identity-and-Access-Management-IAM.svg"),
    ("Google Cloud Storage", "gcp%2FProducts%20and%20services%2FStorage%2FCloud%20Storage.svg"),
    ("Google BigQuery", "gcp%2FProducts%20and%20services%2FData%20Analytics%2FBigQuery.svg"),
    ("Google Cloud Pub/Sub", "gcp%2FProducts%20and%20services%2FData%20Analytics%2FCloud%20PubSub.svg"),
    ("Google Cloud Run", "gcp%2FProducts%20and%20services%2FCompute%2FCloud%20Run.svg"),
    ("Google Kubernetes Engine", "gcp%2FProducts%20and%20services%2FCompute%2FKubernetes%20Engine.svg"),
    ("Azure Blob Storage", "azure%2FStorage%20Service%20Color%2FBlob%20Storage.svg"),
    ("Azure Cosmos DB", "azure%2FDatabases%20Service%20Color%2FAzure%20Cosmos%20DB.svg"),
    ("Azure Functions", "azure%2FCompute%20Service%20Color%2FFunction%20Apps.svg"),
    ("Azure Kubernetes Service", "azure%2FCompute%20Service%20Color%2FContainer%20Services.svg"),
    ("Kubernetes", "dev%2Fkubernetes.svg"),
    ("Docker", "dev%2Fdocker.svg"),
    ("PostgreSQL", "dev%2Fpostgresql.svg"),
    ("MySQL", "dev%2Fmysql.svg"),
    ("Redis", "dev%2Fredis.svg"),
    ("Apache Kafka", "dev%2Fkafka.svg"),
    ("NGINX", "dev%2Fnginx.svg"),
    ("RabbitMQ", "dev%2Frabbitmq.svg"),
    ("Database", "essentials%2F119-database.svg"),
    ("Server", "essentials%2F112-server.svg"),
    ("User", "essentials%2F365-user.svg"),
    ("Browser", "essentials%2F239-internet.svg"),
    ("Mobile", "essentials%2F206-smartphone.svg"),
    ("Firewall", "infra%2F019-firewall.svg"),
    ("Load Balancer", "infra%2F022-load-balancer.svg"),
    ("Cache", "infra%2F006-cache.svg"),
    ("Queue", "infra%2F031-queue.svg"),
];

#[async_trait]
impl IconIndex for BuiltinIconIndex {
    async fn search(&self, query: &str, max_results: usize) -> Vec<IconEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        CATALOG
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .take(max_results)
            .map(|(name, path)| IconEntry {
                name: (*name).to_string(),
                url: format!("{ICON_BASE}/{path}"),
            })
            .collect()
    }
}
